//! CoT type catalogue
//!
//! The backend serves its CoT type taxonomy from `/types` as a tree of
//! `{code, name, next: [...]}` nodes. Lookup walks the tree by longest
//! code prefix, the same way the web UI resolves a type code to its
//! catalogue entry. [`sidc_from_type`] derives a ten-character 2525 SIDC
//! from an atoms (`a-...`) type code.

use serde::{Deserialize, Serialize};

/// One node of the `/types` taxonomy tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeNode {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidc: Option<String>,
    pub next: Vec<TypeNode>,
}

impl TypeNode {
    /// Find the node for `code` by descending through children whose code
    /// prefixes it. The empty code resolves to the tree itself.
    pub fn find(&self, code: &str) -> Option<&TypeNode> {
        if code.is_empty() {
            return Some(self);
        }
        let mut current = self;
        loop {
            let mut descended = false;
            for child in &current.next {
                if child.code == code {
                    return Some(child);
                }
                if code.starts_with(child.code.as_str()) {
                    current = child;
                    descended = true;
                    break;
                }
            }
            if !descended {
                return None;
            }
        }
    }

    /// Find the parent node whose direct child matches `code` exactly.
    pub fn find_root(&self, code: &str) -> Option<&TypeNode> {
        let mut current = self;
        loop {
            let mut descended = false;
            for child in &current.next {
                if child.code == code {
                    return Some(current);
                }
                if code.starts_with(child.code.as_str()) {
                    current = child;
                    descended = true;
                    break;
                }
            }
            if !descended {
                return None;
            }
        }
    }
}

/// Derive a 2525 SIDC from a CoT atoms type code.
///
/// `a-f-G-U-C` becomes `SFGPUC----`. Non-atom codes yield an empty string.
/// Trailing single-letter segments extend the function id; the result is
/// dash-padded to ten characters and uppercased.
pub fn sidc_from_type(cot_type: &str) -> String {
    if !cot_type.starts_with("a-") {
        return String::new();
    }

    let parts: Vec<&str> = cot_type.split('-').collect();
    let mut sidc = String::from("S");
    sidc.push_str(parts[1]);

    if parts.len() > 2 {
        sidc.push_str(parts[2]);
        sidc.push('P');
    } else {
        sidc.push_str("-P");
    }

    if parts.len() > 3 {
        for part in &parts[3..] {
            if part.len() > 1 {
                break;
            }
            sidc.push_str(part);
        }
    }

    while sidc.len() < 10 {
        sidc.push('-');
    }

    sidc.to_uppercase()
}
