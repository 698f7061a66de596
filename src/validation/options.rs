/// Knobs controlling which optional validation passes run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Run the rank-5 shape inference pass on legacy networks
    pub run_legacy_shaper: bool,
    /// Check training configuration of models marked updatable
    pub validate_updatable: bool,
    /// Validate pipeline sub-models on the rayon pool
    pub parallel_pipelines: bool,
    /// Deepest allowed branch/loop nesting
    pub max_nesting_depth: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            run_legacy_shaper: true,
            validate_updatable: true,
            parallel_pipelines: false,
            max_nesting_depth: 64,
        }
    }
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the legacy shape inference pass
    pub fn set_run_legacy_shaper(mut self, enable: bool) -> Self {
        self.run_legacy_shaper = enable;
        self
    }

    /// Enable or disable the training configuration checks
    pub fn set_validate_updatable(mut self, enable: bool) -> Self {
        self.validate_updatable = enable;
        self
    }

    /// Validate pipeline stages in parallel
    pub fn set_parallel_pipelines(mut self, enable: bool) -> Self {
        self.parallel_pipelines = enable;
        self
    }

    pub fn set_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let options = ValidationOptions::new()
            .set_run_legacy_shaper(false)
            .set_parallel_pipelines(true)
            .set_max_nesting_depth(4);
        assert!(!options.run_legacy_shaper);
        assert!(options.validate_updatable);
        assert!(options.parallel_pipelines);
        assert_eq!(options.max_nesting_depth, 4);
    }
}
