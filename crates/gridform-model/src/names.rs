use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

fn is_false(v: &bool) -> bool {
    !*v
}

/// A workbook-level named alias for a cell or range reference.
///
/// `refers_to` is stored as a sheet-qualified reference
/// (`SheetName!$A$1:$B$5`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinedName {
    pub name: String,
    pub refers_to: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

impl DefinedName {
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            refers_to: refers_to.into(),
            hidden: false,
        }
    }
}

/// A reference split into its sheet and range parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetQualifiedRef<'a> {
    /// Sheet name with surrounding quotes removed.
    pub sheet: &'a str,
    /// The range text after the `!`.
    pub range: &'a str,
}

fn sheet_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:'(?P<quoted>[^']+)'|(?P<plain>[^'!]+))!(?P<range>.+)$")
            .expect("sheet reference regex is valid")
    })
}

/// Split `SheetName!Range` (the sheet name optionally `'quoted'`) into its
/// parts. Returns `None` when the text is not sheet-qualified.
pub fn parse_sheet_ref(reference: &str) -> Option<SheetQualifiedRef<'_>> {
    let captures = sheet_ref_regex().captures(reference.trim())?;
    let sheet = captures
        .name("quoted")
        .or_else(|| captures.name("plain"))?
        .as_str();
    let range = captures.name("range")?.as_str();
    Some(SheetQualifiedRef { sheet, range })
}

/// Quote a sheet name for use in a reference if it needs quoting.
pub fn quote_sheet_name(name: &str) -> String {
    let needs_quotes = name
        .chars()
        .any(|c| !(c.is_alphanumeric() || c == '_' || c == '.'));
    if needs_quotes {
        format!("'{name}'")
    } else {
        name.to_string()
    }
}
