use serde::{Deserialize, Serialize};

/// Default operand stack capacity.
pub const STACK_MAX: usize = 256;

/// VM tuning knobs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct VmConfig {
    /// Operand stack capacity; pushing past it is a runtime error.
    pub stack_max: usize,
    /// Log every executed instruction and the stack at `trace` level.
    pub trace_execution: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_max: STACK_MAX,
            trace_execution: false,
        }
    }
}

impl VmConfig {
    pub fn with_stack_max(mut self, stack_max: usize) -> Self {
        self.stack_max = stack_max;
        self
    }

    pub fn with_trace_execution(mut self, trace: bool) -> Self {
        self.trace_execution = trace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_use_defaults() {
        let cfg: VmConfig = toml::from_str("trace_execution = true").unwrap();
        assert_eq!(
            cfg,
            VmConfig {
                stack_max: STACK_MAX,
                trace_execution: true
            }
        );
    }

    #[test]
    fn builder_overrides() {
        let cfg = VmConfig::default()
            .with_stack_max(8)
            .with_trace_execution(true);
        assert_eq!(cfg.stack_max, 8);
        assert!(cfg.trace_execution);
    }
}
