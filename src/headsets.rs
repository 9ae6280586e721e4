//! Static registry of the Quest store sections targeted by the scraper.

/// One store section. `code` is the `hmdType` the Graph API expects, `id`
/// the section node id, `name` the label used in store rows and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Headset {
    pub code: &'static str,
    pub id: &'static str,
    pub name: &'static str,
}

pub const HEADSETS: [Headset; 4] = [
    Headset {
        code: "MONTEREY",
        id: "174868819587665",
        name: "Quest",
    },
    Headset {
        code: "HOLLYWOOD",
        id: "391914765228253",
        name: "Quest 2",
    },
    Headset {
        code: "SEACLIFF",
        id: "5725385550839166",
        name: "Quest Pro",
    },
    Headset {
        code: "EUREKA",
        id: "6571393639607076",
        name: "Quest 3",
    },
];

pub fn by_code(code: &str) -> Option<&'static Headset> {
    HEADSETS.iter().find(|headset| headset.code == code)
}

/// Maps remote `supported_hmd_platforms` codes to display names. Codes the
/// registry does not know are passed through verbatim.
pub fn names_for_codes(codes: &[String]) -> Vec<String> {
    codes
        .iter()
        .map(|code| match by_code(code) {
            Some(headset) => headset.name.to_string(),
            None => code.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn registry_fields_are_unique() {
        let codes: HashSet<_> = HEADSETS.iter().map(|h| h.code).collect();
        let ids: HashSet<_> = HEADSETS.iter().map(|h| h.id).collect();
        let names: HashSet<_> = HEADSETS.iter().map(|h| h.name).collect();
        assert_eq!(codes.len(), HEADSETS.len());
        assert_eq!(ids.len(), HEADSETS.len());
        assert_eq!(names.len(), HEADSETS.len());
    }

    #[test]
    fn lookup_by_code() {
        assert_eq!(by_code("HOLLYWOOD").map(|h| h.name), Some("Quest 2"));
        assert!(by_code("GEARVR").is_none());
    }

    #[test]
    fn unknown_platform_codes_pass_through() {
        let names = names_for_codes(&["HOLLYWOOD".to_string(), "GEARVR".to_string()]);
        assert_eq!(names, vec!["Quest 2".to_string(), "GEARVR".to_string()]);
    }
}
