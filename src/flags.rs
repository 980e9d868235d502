pub enum Flag {
    DryRun,
    Passthrough(String),
}

impl From<String> for Flag {
    fn from(val: String) -> Self {
        match val.as_str() {
            "--dry-run" | "-d" => Flag::DryRun,
            _ => Flag::Passthrough(val),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedFlags {
    pub dry_run: bool,
    /// Arguments handed to the generator, dry-run flags removed.
    pub forwarded: Vec<String>,
}

pub fn parse_flags<I, S>(args: I) -> ParsedFlags
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut parsed = ParsedFlags::default();
    for arg in args {
        match Flag::from(arg.into()) {
            Flag::DryRun => parsed.dry_run = true,
            Flag::Passthrough(arg) => parsed.forwarded.push(arg),
        }
    }
    parsed
}
