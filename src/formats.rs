/// Storage providers the stock host knows how to generate.
pub const DEFAULT_FORMATS: [&str; 4] = ["anvil", "mcregion", "pmanvil", "leveldb"];

/// Named world storage providers. Lookups ignore ASCII case.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn register(&mut self, name: &str) {
        if self.get(name).is_none() {
            self.providers.push(name.to_lowercase());
        }
    }

    /// The canonical provider name for `name`, if registered.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.providers
            .iter()
            .find(|p| p.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        for name in DEFAULT_FORMATS {
            registry.register(name);
        }
        registry
    }
}
