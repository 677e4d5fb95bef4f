#[derive(Debug, Clone)]
pub struct Category {
    pub id: Option<i64>,
    pub name: String,
}

impl Category {
    #[cfg(test)]
    pub fn new(name: String) -> Self {
        Self { id: None, name }
    }

    /// Default set seeded into a fresh database. "Other" is the catch-all
    /// the external classifier is told to use.
    pub fn defaults() -> &'static [&'static str] {
        &[
            "Food",
            "Transport",
            "Groceries",
            "Utilities",
            "Rent",
            "Income",
            "Shopping",
            "Entertainment",
            "Health",
            "Travel",
            "Education",
            "Fees",
            "Other",
        ]
    }

    /// Find a category by ID in a slice.
    pub fn find_by_id(categories: &[Category], id: i64) -> Option<&Category> {
        categories.iter().find(|c| c.id == Some(id))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
