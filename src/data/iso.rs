/// ISO 3166-1 numeric -> alpha-3 for the whaling nations and their territories.
/// Outlines such as world-atlas only carry the numeric id.
const NUMERIC_TO_ALPHA3: &[(u16, &str)] = &[
    (32, "ARG"),
    (36, "AUS"),
    (76, "BRA"),
    (124, "CAN"),
    (152, "CHL"),
    (156, "CHN"),
    (208, "DNK"),
    (234, "FRO"),
    (250, "FRA"),
    (276, "DEU"),
    (304, "GRL"),
    (352, "ISL"),
    (360, "IDN"),
    (392, "JPN"),
    (408, "PRK"),
    (410, "KOR"),
    (528, "NLD"),
    (554, "NZL"),
    (578, "NOR"),
    (604, "PER"),
    (608, "PHL"),
    (620, "PRT"),
    (643, "RUS"),
    (670, "VCT"),
    (710, "ZAF"),
    (724, "ESP"),
    (752, "SWE"),
    (826, "GBR"),
    (840, "USA"),
];

pub fn alpha3_from_numeric(id: u16) -> Option<&'static str> {
    NUMERIC_TO_ALPHA3
        .iter()
        .find(|(numeric, _)| *numeric == id)
        .map(|(_, code)| *code)
}

/// Accepts zero-padded strings ("076") as world-atlas writes them
pub fn alpha3_from_numeric_str(id: &str) -> Option<&'static str> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse::<u16>().ok().and_then(alpha3_from_numeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(alpha3_from_numeric(578), Some("NOR"));
        assert_eq!(alpha3_from_numeric(1), None);
    }

    #[test]
    fn test_zero_padded_string() {
        assert_eq!(alpha3_from_numeric_str("076"), Some("BRA"));
        assert_eq!(alpha3_from_numeric_str("304"), Some("GRL"));
        assert_eq!(alpha3_from_numeric_str("-99"), None);
        assert_eq!(alpha3_from_numeric_str(""), None);
    }
}
