use std::collections::HashMap;

/// Teacher-name correction table. Maps every raw spelling seen in the wild
/// to one canonical spelling so the teachers index stays de-duplicated.
///
/// Injected where needed; never global. The constructor rejects tables that
/// would break idempotence, so `canonicalize(canonicalize(x)) ==
/// canonicalize(x)` holds for any table that exists at runtime.
#[derive(Debug, Clone)]
pub struct Corrections {
    map: HashMap<String, String>,
}

impl Corrections {
    /// A value that is itself a key must map to itself, otherwise two
    /// passes over the same name would disagree.
    pub fn new(map: HashMap<String, String>) -> anyhow::Result<Self> {
        for value in map.values() {
            if let Some(onward) = map.get(value) {
                if onward != value {
                    anyhow::bail!(
                        "correction table is not idempotent: {:?} -> {:?} -> {:?}",
                        value,
                        value,
                        onward
                    );
                }
            }
        }
        Ok(Self { map })
    }

    pub fn canonicalize(&self, raw: &str) -> String {
        // Source pages pad names with non-breaking spaces now and then.
        let clean = raw.replace('\u{00A0}', " ");
        let clean = clean.trim();
        match self.map.get(clean) {
            Some(canonical) => canonical.clone(),
            None => clean.to_string(),
        }
    }

    /// The correction list accumulated against the live source. Config may
    /// layer more entries on top of this.
    pub fn default_table() -> HashMap<String, String> {
        let pairs = [
            ("Dr.Hema Gaikwad", "Dr. Hema Gaikwad"),
            ("Ms. Hema Gaikwad", "Dr. Hema Gaikwad"),
            ("Dr.Aniket Nagane", "Dr. Aniket Nagane"),
            ("Dr. Aniket Nagane ", "Dr. Aniket Nagane"),
            ("Mr.Rohan Bhase", "Mr. Rohan Bhase"),
            ("Mr. Rohan Bhase", "Mr. Rohan Bhase"),
            ("Dr.Shashikant Nehul", "Dr. Shashikant Nehul"),
            ("Mr. Shashikant Nehul", "Dr. Shashikant Nehul"),
            ("Ms. Kirti Mehere", "Ms. Kirti Mehare"),
            ("Ms. Kirti Mehare", "Ms. Kirti Mehare"),
            ("Ms.Mrinmayi Huparikar", "Ms. Mrinmayi Huprikar"),
            ("Ms.Mrinmayi Huprikar", "Ms. Mrinmayi Huprikar"),
            ("Mr.Gopal Phadke", "Mr. Gopal Phadke"),
            ("Mr. Gopal Phadke", "Mr. Gopal Phadke"),
            ("Dr.Farhana Desai", "Dr. Farhana Desai"),
            ("Dr. Farhana Desai ", "Dr. Farhana Desai"),
            ("Dr. Farhana Desai", "Dr. Farhana Desai"),
            (
                "Database and Application Security- Dr. Farhana Desai",
                "Dr. Farhana Desai",
            ),
            ("Ms.Shatakshi Swaroop", "Ms. Shatakshi Swaroop"),
            ("Ms. Shatakshi Swaroop", "Ms. Shatakshi Swaroop"),
            ("(BFM) - Ms. Shatakshi Swaroop", "Ms. Shatakshi Swaroop"),
            ("Mr.Chaitanya Kulkarni", "Mr. Chaitanya Kulkarni"),
            ("Mr. Chaitanya Kulkarni", "Mr. Chaitanya Kulkarni"),
            ("Mr. Satyajeet Wale", "Mr. Satyajit Wale"),
            ("Mr. Satyajit Wale", "Mr. Satyajit Wale"),
        ];
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub fn default_corrections() -> Self {
        // The shipped table satisfies the constructor invariant; if an edit
        // ever breaks that, unit tests catch it before a release does.
        Self::new(Self::default_table()).expect("default correction table is idempotent")
    }
}
