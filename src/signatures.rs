// SPDX-License-Identifier: BSD-3-Clause
//! User-supplied descriptions of external functions.
//!
//! A signatures file is a JSON object mapping regular expressions over
//! symbol names to lists of signatures:
//!
//! ```json
//! {
//!   "^xmalloc$": [{"return-alloc": {"type": "heap"}}],
//!   "^my_pool_get": [{"return-alloc": {"type": "top"}}]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use regex::RegexSet;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Couldn't read signatures file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Couldn't parse signatures: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Bad regular expression in signatures: {0}")]
    Regex(#[from] regex::Error),
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocType {
    Heap,
    Stack,
    /// Nothing is known about the returned pointer
    Top,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Signature {
    ReturnAlloc { r#type: AllocType },
}

#[derive(Debug)]
pub struct Signatures {
    sigs: HashMap<String, Vec<Signature>>,
    /// Sorted, so that matches are reported in a stable order
    regexes: Vec<String>,
    set: RegexSet,
}

impl Default for Signatures {
    fn default() -> Self {
        Signatures {
            sigs: HashMap::new(),
            regexes: Vec::new(),
            set: RegexSet::empty(),
        }
    }
}

impl Signatures {
    pub fn new(sigs: HashMap<String, Vec<Signature>>) -> Result<Self, Error> {
        let mut regexes: Vec<String> = sigs.keys().cloned().collect();
        regexes.sort();
        let set = RegexSet::new(&regexes)?;
        Ok(Signatures { sigs, regexes, set })
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        let sigs = serde_json::from_reader(std::io::BufReader::new(file))?;
        Self::new(sigs)
    }

    pub fn len(&self) -> usize {
        self.regexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regexes.is_empty()
    }

    pub fn signatures_for(&self, func: &str) -> Option<Vec<Signature>> {
        let mut matched = false;
        let mut sigs = Vec::new();
        for m in self.set.matches(func) {
            matched = true;
            sigs.extend(self.sigs[&self.regexes[m]].iter().cloned());
        }
        if matched {
            Some(sigs)
        } else {
            None
        }
    }

    /// What the signatures say about the pointer returned by `func`. `Top`
    /// wins over `Heap` and `Stack` when several signatures match.
    pub fn return_alloc(&self, func: &str) -> Option<AllocType> {
        let mut result = None;
        for sig in self.signatures_for(func)? {
            match sig {
                Signature::ReturnAlloc { r#type } => {
                    if r#type == AllocType::Top {
                        return Some(AllocType::Top);
                    }
                    result = Some(r#type);
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{AllocType, Signature, Signatures};

    #[test]
    fn empty() {
        let sigs = Signatures::new(HashMap::from([])).unwrap();
        assert_eq!(None, sigs.signatures_for("f"));
        assert!(sigs.is_empty());
        assert_eq!(None, Signatures::default().return_alloc("f"));
    }

    #[test]
    fn parse() {
        let sigs = Signatures::from_json(
            r#"{
                "^xmalloc$": [{"return-alloc": {"type": "heap"}}],
                "^x": [{"return-alloc": {"type": "stack"}}],
                "pool": [{"return-alloc": {"type": "top"}}]
            }"#,
        )
        .unwrap();
        assert_eq!(3, sigs.len());
        assert_eq!(
            Some(vec![
                Signature::ReturnAlloc {
                    r#type: AllocType::Stack
                },
                Signature::ReturnAlloc {
                    r#type: AllocType::Heap
                },
            ]),
            sigs.signatures_for("xmalloc")
        );
        assert_eq!(Some(AllocType::Heap), sigs.return_alloc("xmalloc"));
        assert_eq!(Some(AllocType::Top), sigs.return_alloc("xpool"));
        assert_eq!(None, sigs.return_alloc("malloc"));
    }

    #[test]
    fn errors() {
        assert!(Signatures::from_json("{").is_err());
        assert!(Signatures::from_json(r#"{"(": []}"#).is_err());
        assert!(Signatures::from_json(r#"{"f": [{"calls-arg": {"arg": 0}}]}"#).is_err());
    }
}
