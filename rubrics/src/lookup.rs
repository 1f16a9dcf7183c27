//! Identifier-keyed lookup for selection lists.

use std::collections::HashMap;

use gb_core::Identified;

/// Records indexed by identifier, keeping their original order for display.
#[derive(Debug, Clone)]
pub struct SelectionIndex<T> {
    items: Vec<T>,
    positions: HashMap<String, usize>
}

impl<T: Identified> SelectionIndex<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        let mut index = Self {
            items: Vec::new(),
            positions: HashMap::new()
        };
        for item in items {
            // Later duplicates replace earlier ones in place.
            match index.positions.get(item.uuid()) {
                Some(&position) => index.items[position] = item,
                None => {
                    index
                        .positions
                        .insert(item.uuid().to_string(), index.items.len());
                    index.items.push(item);
                }
            }
        }
        index
    }

    pub fn get(&self, uuid: &str) -> Option<&T> {
        self.positions.get(uuid).map(|&position| &self.items[position])
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.positions.contains_key(uuid)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// (identifier, label) pairs for a picker.
    pub fn options<F>(&self, label: F) -> Vec<(String, String)>
    where
        F: Fn(&T) -> String
    {
        self.items
            .iter()
            .map(|item| (item.uuid().to_string(), label(item)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gb_core::Rubric;

    fn rubric(uuid: &str, title: &str) -> Rubric {
        Rubric {
            title: Some(title.to_string()),
            ..Rubric::new(uuid)
        }
    }

    #[test]
    fn test_lookup_by_identifier() {
        let index = SelectionIndex::new(vec![rubric("r1", "Essay"), rubric("r2", "Lab")]);

        assert_eq!(index.get("r2").unwrap().title.as_deref(), Some("Lab"));
        assert!(index.get("r3").is_none());
        assert!(index.contains("r1"));
    }

    #[test]
    fn test_duplicate_replaces_in_place() {
        let index = SelectionIndex::new(vec![
            rubric("r1", "Old"),
            rubric("r2", "Lab"),
            rubric("r1", "New"),
        ]);

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.options(|r| r.title.clone().unwrap_or_default()),
            vec![
                ("r1".to_string(), "New".to_string()),
                ("r2".to_string(), "Lab".to_string())
            ]
        );
    }
}
