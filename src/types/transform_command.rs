use std::ffi::OsString;
use std::fmt;
use std::path::Path;

pub const SOURCE_PLACEHOLDER: &str = "{source}";
pub const DESTINATION_PLACEHOLDER: &str = "{destination}";
pub const DESTINATION_PLACEHOLDER_ALIAS: &str = "{dest}";

pub const DEFAULT_TRANSFORM_COMMAND: &str = "cp {source} {destination}";

const NO_PROGRAM: &str = "transform command must not be empty.";
const PLACEHOLDER_IN_PROGRAM: &str = "transform program must not contain a placeholder.";
const MISSING_SOURCE: &str = "transform command must contain {source}.";
const MISSING_DESTINATION: &str = "transform command must contain {destination}.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgSegment {
    Literal(String),
    Source,
    Destination,
}

/// One argument of the transform command. An argument may embed a path slot,
/// e.g. `--output={destination}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformArg {
    segments: Vec<ArgSegment>,
}

impl TransformArg {
    fn parse(word: &str) -> Self {
        let placeholders = [
            (SOURCE_PLACEHOLDER, ArgSegment::Source),
            (DESTINATION_PLACEHOLDER, ArgSegment::Destination),
            (DESTINATION_PLACEHOLDER_ALIAS, ArgSegment::Destination),
        ];

        let mut segments = Vec::new();
        let mut rest = word;
        loop {
            let next = placeholders
                .iter()
                .filter_map(|(placeholder, segment)| {
                    rest.find(placeholder)
                        .map(|position| (position, placeholder.len(), segment))
                })
                .min_by_key(|(position, _, _)| *position);

            match next {
                Some((position, length, segment)) => {
                    if 0 < position {
                        segments.push(ArgSegment::Literal(rest[..position].to_string()));
                    }
                    segments.push(segment.clone());
                    rest = &rest[position + length..];
                }
                None => {
                    if !rest.is_empty() {
                        segments.push(ArgSegment::Literal(rest.to_string()));
                    }
                    break;
                }
            }
        }

        Self { segments }
    }

    fn contains(&self, target: &ArgSegment) -> bool {
        self.segments.iter().any(|segment| segment == target)
    }

    fn render(&self, source: &Path, destination: &Path) -> OsString {
        let mut rendered = OsString::new();
        for segment in &self.segments {
            match segment {
                ArgSegment::Literal(literal) => rendered.push(literal),
                ArgSegment::Source => rendered.push(source.as_os_str()),
                ArgSegment::Destination => rendered.push(destination.as_os_str()),
            }
        }
        rendered
    }
}

impl fmt::Display for TransformArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                ArgSegment::Literal(literal) => write!(f, "{literal}")?,
                ArgSegment::Source => write!(f, "{SOURCE_PLACEHOLDER}")?,
                ArgSegment::Destination => write!(f, "{DESTINATION_PLACEHOLDER}")?,
            }
        }
        Ok(())
    }
}

/// Program plus argument list with explicit source and destination slots.
/// The command is executed directly, never through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformCommand {
    program: String,
    args: Vec<TransformArg>,
}

impl TransformCommand {
    /// Parses a whitespace separated template such as `cp {source} {destination}`.
    pub fn parse_template(template: &str) -> Result<Self, String> {
        Self::from_words(template.split_whitespace().map(str::to_string))
    }

    pub fn from_words(words: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut words = words.into_iter();
        let program = words.next().ok_or_else(|| NO_PROGRAM.to_string())?;
        if TransformArg::parse(&program)
            .segments
            .iter()
            .any(|segment| !matches!(segment, ArgSegment::Literal(_)))
        {
            return Err(PLACEHOLDER_IN_PROGRAM.to_string());
        }

        let args: Vec<TransformArg> = words.map(|word| TransformArg::parse(&word)).collect();
        if !args.iter().any(|arg| arg.contains(&ArgSegment::Source)) {
            return Err(MISSING_SOURCE.to_string());
        }
        if !args.iter().any(|arg| arg.contains(&ArgSegment::Destination)) {
            return Err(MISSING_DESTINATION.to_string());
        }

        Ok(Self { program, args })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn render_args(&self, source: &Path, destination: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(|arg| arg.render(source, destination))
            .collect()
    }
}

impl Default for TransformCommand {
    fn default() -> Self {
        Self {
            program: "cp".to_string(),
            args: vec![
                TransformArg {
                    segments: vec![ArgSegment::Source],
                },
                TransformArg {
                    segments: vec![ArgSegment::Destination],
                },
            ],
        }
    }
}

impl fmt::Display for TransformCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
