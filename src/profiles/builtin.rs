/// Profiles compiled into the binary, keyed by file name.
const BUNDLED: &[(&str, &str)] = &[
    ("examples.txt", include_str!("../../profiles/examples.txt")),
    ("minimal.txt", include_str!("../../profiles/minimal.txt")),
];

/// A read-only collection of built-in profile files.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinBundle {
    entries: &'static [(&'static str, &'static str)],
}

impl BuiltinBundle {
    pub fn bundled() -> Self {
        Self::new(BUNDLED)
    }

    pub fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }

    pub fn get(&self, file_name: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(name, _)| *name == file_name)
            .map(|(_, text)| *text)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }
}

impl Default for BuiltinBundle {
    fn default() -> Self {
        Self::bundled()
    }
}
