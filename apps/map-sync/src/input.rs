//! Line commands for the interactive binary.

use crate::controller::{parse_coordinate, Event, InputError, ViewSide};
use crate::geo::LatLng;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  mark <lat> <lng>                     add a location typed into the entry form
  click <lat> <lng>                    click the street view at a coordinate
  remove <index>                       remove the location with that index
  clear                                remove every location
  zoom <level>                         move the zoom slider
  pan <street|satellite> <lat> <lng> [zoom]
                                       drag one view; the other follows
  show                                 print the table and both views
  help                                 print this text
  quit                                 exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Dispatch(Event),
    Pan {
        side: ViewSide,
        center: LatLng,
        zoom: Option<u8>,
    },
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown command {0:?} (try `help`)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Coordinate(#[from] InputError),
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Action>, CommandError> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = parts.collect();

    let action = match command.to_ascii_lowercase().as_str() {
        // Raw strings: validation (and the alert) belong to the entry form handling.
        "mark" => Action::Dispatch(Event::ManualEntrySubmitted {
            latitude: args.first().copied().unwrap_or_default().to_string(),
            longitude: args.get(1).copied().unwrap_or_default().to_string(),
        }),
        "click" => match args.as_slice() {
            [lat, lng] => Action::Dispatch(Event::MapClicked(LatLng::new(
                parse_coordinate("latitude", lat)?,
                parse_coordinate("longitude", lng)?,
            ))),
            _ => return Err(CommandError::Usage("click <lat> <lng>")),
        },
        "remove" => match args.as_slice() {
            [index] => Action::Dispatch(Event::MarkerRemoveRequested(
                index
                    .parse()
                    .map_err(|_| CommandError::Usage("remove <index>"))?,
            )),
            _ => return Err(CommandError::Usage("remove <index>")),
        },
        "clear" => Action::Dispatch(Event::ClearRequested),
        "zoom" => match args.as_slice() {
            [level] => Action::Dispatch(Event::ZoomSliderChanged(
                level
                    .parse()
                    .map_err(|_| CommandError::Usage("zoom <level 0-255>"))?,
            )),
            _ => return Err(CommandError::Usage("zoom <level>")),
        },
        "pan" => parse_pan(&args)?,
        "show" => Action::Show,
        "help" | "?" => Action::Help,
        "quit" | "exit" => Action::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(action))
}

fn parse_pan(args: &[&str]) -> Result<Action, CommandError> {
    const USAGE: &str = "pan <street|satellite> <lat> <lng> [zoom]";
    let (side, lat, lng, zoom) = match args {
        [side, lat, lng] => (side, lat, lng, None),
        [side, lat, lng, zoom] => (side, lat, lng, Some(zoom)),
        _ => return Err(CommandError::Usage(USAGE)),
    };
    let side = match side.to_ascii_lowercase().as_str() {
        "street" | "primary" => ViewSide::Primary,
        "satellite" | "secondary" => ViewSide::Secondary,
        _ => return Err(CommandError::Usage(USAGE)),
    };
    let zoom = zoom
        .map(|raw| raw.parse::<u8>().map_err(|_| CommandError::Usage(USAGE)))
        .transpose()?;

    Ok(Action::Pan {
        side,
        center: LatLng::new(
            parse_coordinate("latitude", lat)?,
            parse_coordinate("longitude", lng)?,
        ),
        zoom,
    })
}
