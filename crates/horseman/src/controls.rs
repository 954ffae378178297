//! Line-oriented control commands read from stdin.

use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ControlError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{0} needs a value")]
    MissingArgument(&'static str),
    #[error("not a number: {0}")]
    InvalidNumber(String),
    #[error("expected on or off, got {0}")]
    InvalidToggle(String),
}

/// A user action on the live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Start,
    Capture,
    Photo,
    Flip,
    /// Set head hiding; `None` toggles.
    Hide(Option<bool>),
    /// Cutout scale in percent.
    Scale(i32),
    X(i32),
    Y(i32),
    Resize(u32, u32),
    Quit,
}

impl FromStr for Control {
    type Err = ControlError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Err(ControlError::Unknown(String::new()));
        };

        let control = match command.to_ascii_lowercase().as_str() {
            "start" => Control::Start,
            "capture" => Control::Capture,
            "photo" => Control::Photo,
            "flip" => Control::Flip,
            "hide" => Control::Hide(match words.next() {
                None => None,
                Some(v) => Some(parse_toggle(v)?),
            }),
            "scale" => Control::Scale(parse_int(words.next(), "scale")?),
            "x" => Control::X(parse_int(words.next(), "x")?),
            "y" => Control::Y(parse_int(words.next(), "y")?),
            "resize" => {
                let w = parse_int(words.next(), "resize")?;
                let h = parse_int(words.next(), "resize")?;
                Control::Resize(w.max(0) as u32, h.max(0) as u32)
            }
            "quit" | "exit" => Control::Quit,
            other => return Err(ControlError::Unknown(other.to_string())),
        };
        Ok(control)
    }
}

fn parse_toggle(value: &str) -> Result<bool, ControlError> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(ControlError::InvalidToggle(value.to_string())),
    }
}

/// Read a base-10 integer prefix, ignoring trailing characters ("120%" is 120).
fn parse_int(value: Option<&str>, name: &'static str) -> Result<i32, ControlError> {
    let value = value.ok_or(ControlError::MissingArgument(name))?;
    let digits_end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(value.len(), |(i, _)| i);
    value[..digits_end]
        .parse()
        .map_err(|_| ControlError::InvalidNumber(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!("start".parse::<Control>(), Ok(Control::Start));
        assert_eq!("  Capture ".parse::<Control>(), Ok(Control::Capture));
        assert_eq!("photo".parse::<Control>(), Ok(Control::Photo));
        assert_eq!("flip".parse::<Control>(), Ok(Control::Flip));
        assert_eq!("quit".parse::<Control>(), Ok(Control::Quit));
    }

    #[test]
    fn test_hide_toggle_forms() {
        assert_eq!("hide".parse::<Control>(), Ok(Control::Hide(None)));
        assert_eq!("hide on".parse::<Control>(), Ok(Control::Hide(Some(true))));
        assert_eq!("hide OFF".parse::<Control>(), Ok(Control::Hide(Some(false))));
        assert_eq!(
            "hide maybe".parse::<Control>(),
            Err(ControlError::InvalidToggle("maybe".into()))
        );
    }

    #[test]
    fn test_numeric_arguments() {
        assert_eq!("scale 150".parse::<Control>(), Ok(Control::Scale(150)));
        assert_eq!("x -40".parse::<Control>(), Ok(Control::X(-40)));
        assert_eq!("y +12".parse::<Control>(), Ok(Control::Y(12)));
        assert_eq!("resize 800 600".parse::<Control>(), Ok(Control::Resize(800, 600)));
    }

    #[test]
    fn test_integer_prefix() {
        assert_eq!("scale 120%".parse::<Control>(), Ok(Control::Scale(120)));
        assert_eq!("x 7.9".parse::<Control>(), Ok(Control::X(7)));
        assert_eq!(
            "scale abc".parse::<Control>(),
            Err(ControlError::InvalidNumber("abc".into()))
        );
        assert_eq!(
            "y -".parse::<Control>(),
            Err(ControlError::InvalidNumber("-".into()))
        );
    }

    #[test]
    fn test_missing_and_unknown() {
        assert_eq!(
            "scale".parse::<Control>(),
            Err(ControlError::MissingArgument("scale"))
        );
        assert_eq!(
            "resize 640".parse::<Control>(),
            Err(ControlError::MissingArgument("resize"))
        );
        assert_eq!(
            "dance".parse::<Control>(),
            Err(ControlError::Unknown("dance".into()))
        );
        assert!("".parse::<Control>().is_err());
    }

    #[test]
    fn test_negative_resize_clamps() {
        assert_eq!("resize -5 10".parse::<Control>(), Ok(Control::Resize(0, 10)));
    }
}
