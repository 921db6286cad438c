//! Static synonym table for Australian capital-city regions.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionSynonyms {
    pub canonical: &'static str,
    pub city: &'static str,
    pub abbreviation: &'static str,
    pub state: &'static str,
}

impl RegionSynonyms {
    pub fn labels(&self) -> [&'static str; 4] { [self.canonical, self.city, self.abbreviation, self.state] }

    fn matches(&self, query: &str) -> bool { self.labels().iter().any(|l| l.eq_ignore_ascii_case(query)) }
}

const fn region(canonical: &'static str, city: &'static str, abbreviation: &'static str, state: &'static str) -> RegionSynonyms {
    RegionSynonyms { canonical, city, abbreviation, state }
}

pub const REGIONS: [RegionSynonyms; 8] = [
    region("Greater Sydney", "Sydney", "NSW", "New South Wales"),
    region("Greater Melbourne", "Melbourne", "VIC", "Victoria"),
    region("Greater Brisbane", "Brisbane", "QLD", "Queensland"),
    region("Greater Adelaide", "Adelaide", "SA", "South Australia"),
    region("Greater Perth", "Perth", "WA", "Western Australia"),
    region("Greater Hobart", "Hobart", "TAS", "Tasmania"),
    region("Greater Darwin", "Darwin", "NT", "Northern Territory"),
    region("Australian Capital Territory", "Canberra", "ACT", "Australian Capital Territory"),
];

pub fn lookup(query: &str) -> Option<&'static RegionSynonyms> {
    let q = query.trim();
    REGIONS.iter().find(|r| r.matches(q))
}

/// Labels to look for in the index data: the whole synonym set on a table hit,
/// otherwise just the query itself.
pub fn candidate_labels(query: &str) -> Vec<String> {
    match lookup(query) {
        Some(r) => {
            let mut out: Vec<String> = Vec::with_capacity(4);
            for l in r.labels() {
                if !out.iter().any(|o| o == l) { out.push(l.to_string()); }
            }
            out
        }
        None => vec![query.trim().to_string()],
    }
}
