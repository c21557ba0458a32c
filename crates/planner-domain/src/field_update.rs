/// Three-state edit of an optional field: leave it, replace it, or erase it
///
/// ```
/// use planner_domain::FieldUpdate;
///
/// let mut notes = Some("order parts".to_string());
/// FieldUpdate::Set("parts ordered".to_string()).apply_to(&mut notes);
/// assert_eq!(notes.as_deref(), Some("parts ordered"));
///
/// FieldUpdate::<String>::Clear.apply_to(&mut notes);
/// assert_eq!(notes, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    #[default]
    NoChange,
    Set(T),
    Clear,
}

impl<T> FieldUpdate<T> {
    pub fn apply_to(self, field: &mut Option<T>) {
        match self {
            Self::NoChange => {}
            Self::Set(value) => *field = Some(value),
            Self::Clear => *field = None,
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_change_keeps_value() {
        let mut notes = Some("keep".to_string());
        FieldUpdate::NoChange.apply_to(&mut notes);
        assert_eq!(notes.as_deref(), Some("keep"));
        assert!(!FieldUpdate::<String>::NoChange.is_change());
        assert!(FieldUpdate::<String>::Clear.is_change());
    }
}
