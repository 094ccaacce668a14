/// Static table merging dependent territories with their governing country.
///
/// `territories` says whose catches a territory inherits when it has no
/// record of its own; `groups` lists codes that are displayed as one
/// entity on hover (their figures are summed).
pub struct AliasMap {
    territories: &'static [(&'static str, &'static str)],
    groups: &'static [&'static [&'static str]],
}

/// Denmark reports Greenland and Faroe Islands catches under its own name.
pub static ALIASES: AliasMap = AliasMap {
    territories: &[("GRL", "DNK"), ("FRO", "DNK")],
    groups: &[&["DNK", "GRL", "FRO"]],
};

impl AliasMap {
    /// Governing country of a dependent territory
    pub fn governing(&self, code: &str) -> Option<&'static str> {
        self.territories
            .iter()
            .find(|(territory, _)| *territory == code)
            .map(|(_, parent)| *parent)
    }

    /// All codes displayed together with `code`, including `code` itself
    pub fn group<'a>(&self, code: &'a str) -> Vec<&'a str> {
        match self.groups.iter().find(|g| g.iter().any(|c| *c == code)) {
            Some(group) => group.to_vec(),
            None => vec![code],
        }
    }

    pub fn related(&self, a: &str, b: &str) -> bool {
        a == b
            || self
                .groups
                .iter()
                .any(|g| g.iter().any(|c| *c == a) && g.iter().any(|c| *c == b))
    }
}
