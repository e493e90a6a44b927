//! Ordered list of models to try for one verification

/// Primary model followed by fallbacks, duplicates and blanks removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChain {
    models: Vec<String>,
}

impl ModelChain {
    pub fn new(primary: &str, fallbacks: &[String]) -> Self {
        let mut models: Vec<String> = Vec::with_capacity(fallbacks.len() + 1);
        for model in std::iter::once(primary).chain(fallbacks.iter().map(String::as_str)) {
            let model = model.trim();
            if !model.is_empty() && !models.iter().any(|seen| seen == model) {
                models.push(model.to_string());
            }
        }
        Self { models }
    }

    /// First model in the chain; empty only if every entry was blank
    pub fn primary(&self) -> &str {
        self.models.first().map(String::as_str).unwrap_or_default()
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_kept_and_duplicates_dropped() {
        let chain = ModelChain::new(
            "a",
            &["b".to_string(), "a".to_string(), " ".to_string(), "c".to_string(), "b".to_string()],
        );
        assert_eq!(chain.models(), &["a", "b", "c"]);
        assert_eq!(chain.primary(), "a");
    }

    #[test]
    fn test_primary_only() {
        let chain = ModelChain::new("gpt-4o-mini", &[]);
        assert_eq!(chain.len(), 1);
    }
}
