use serde::Serialize;
use std::collections::HashMap;

// ── Caretaker ───────────────────────────────────────────────────────────────

/// A participant contributing to a session's cooperative bonus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caretaker {
    pub id: String,
    pub emoji: String,
}

// ── CaretakerRegistry ───────────────────────────────────────────────────────

/// The set of participants in the current session.
///
/// There is no leave operation: the transport gives no presence guarantees,
/// so a participant who disconnects mid-session still counts toward the
/// coop bonus. The registry is cleared only when a new joining phase starts.
#[derive(Debug, Default)]
pub struct CaretakerRegistry {
    entries: HashMap<String, String>,
}

impl CaretakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a participant. Returns `true` on first insert; a rejoin with a
    /// different emoji updates the display emoji and returns `false`.
    pub fn add(&mut self, id: impl Into<String>, emoji: impl Into<String>) -> bool {
        self.entries.insert(id.into(), emoji.into()).is_none()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn count(&self) -> u32 {
        self.entries.len() as u32
    }

    /// All participants, sorted by id for stable output.
    pub fn all(&self) -> Vec<Caretaker> {
        let mut list: Vec<Caretaker> = self
            .entries
            .iter()
            .map(|(id, emoji)| Caretaker {
                id: id.clone(),
                emoji: emoji.clone(),
            })
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_count() {
        let mut reg = CaretakerRegistry::new();
        assert_eq!(reg.count(), 0);

        assert!(reg.add("pet-1", "🐶"));
        assert!(reg.add("pet-2", "🐱"));
        assert_eq!(reg.count(), 2);
        assert!(reg.contains("pet-1"));
        assert!(!reg.contains("pet-3"));
    }

    #[test]
    fn test_rejoin_updates_emoji_not_count() {
        let mut reg = CaretakerRegistry::new();
        assert!(reg.add("pet-1", "🐶"));
        assert!(!reg.add("pet-1", "🦊"));

        assert_eq!(reg.count(), 1);
        assert_eq!(reg.all()[0].emoji, "🦊");
    }

    #[test]
    fn test_all_is_sorted_by_id() {
        let mut reg = CaretakerRegistry::new();
        reg.add("pet-c", "🐼");
        reg.add("pet-a", "🐶");
        reg.add("pet-b", "🐱");

        let all = reg.all();
        let ids: Vec<&str> = all.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["pet-a", "pet-b", "pet-c"]);
    }

    #[test]
    fn test_clear_empties_the_registry() {
        let mut reg = CaretakerRegistry::new();
        reg.add("pet-1", "🐶");
        reg.clear();

        assert_eq!(reg.count(), 0);
        assert!(reg.all().is_empty());
    }
}
