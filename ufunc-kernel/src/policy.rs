//! Execution strategy selection.

/// Rectangles with at most this many points run serially by default.
pub const MIN_PARALLEL_LEN: usize = 1 << 15;

/// Environment variable selecting the strategy (`serial` or `parallel`).
pub const STRATEGY_ENV: &str = "UFUNC_STRATEGY";

/// Environment variable overriding [`MIN_PARALLEL_LEN`].
pub const MIN_PARALLEL_LEN_ENV: &str = "UFUNC_MIN_PARALLEL_LEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// One logical thread, row-major iteration.
    Serial,
    /// Recursive splitting across the ambient rayon pool.
    Parallel,
}

impl Strategy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "serial" => Some(Strategy::Serial),
            "parallel" => Some(Strategy::Parallel),
            _ => None,
        }
    }
}

/// How a task body iterates its rectangle.
///
/// Both strategies produce the same result. `Parallel` only engages for
/// rectangles larger than `min_parallel_len` when the pool has more than one
/// worker; without the `parallel` feature it always runs serially.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecPolicy {
    strategy: Strategy,
    min_parallel_len: usize,
}

impl Default for ExecPolicy {
    fn default() -> Self {
        if cfg!(feature = "parallel") {
            Self::parallel()
        } else {
            Self::serial()
        }
    }
}

impl ExecPolicy {
    pub const fn serial() -> Self {
        Self {
            strategy: Strategy::Serial,
            min_parallel_len: MIN_PARALLEL_LEN,
        }
    }

    pub const fn parallel() -> Self {
        Self {
            strategy: Strategy::Parallel,
            min_parallel_len: MIN_PARALLEL_LEN,
        }
    }

    pub fn with_min_parallel_len(self, min_parallel_len: usize) -> Self {
        Self {
            min_parallel_len,
            ..self
        }
    }

    #[inline]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    #[inline]
    pub fn min_parallel_len(&self) -> usize {
        self.min_parallel_len
    }

    /// Default policy overridden by [`STRATEGY_ENV`] and
    /// [`MIN_PARALLEL_LEN_ENV`]. Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut policy = Self::default();
        if let Some(value) = lookup(STRATEGY_ENV) {
            match Strategy::from_name(&value) {
                Some(strategy) => policy.strategy = strategy,
                None => tracing::warn!(var = STRATEGY_ENV, %value, "ignoring unknown strategy"),
            }
        }
        if let Some(value) = lookup(MIN_PARALLEL_LEN_ENV) {
            match value.trim().parse::<usize>() {
                Ok(len) => policy.min_parallel_len = len,
                Err(err) => {
                    tracing::warn!(var = MIN_PARALLEL_LEN_ENV, %value, %err, "ignoring invalid length");
                }
            }
        }
        tracing::debug!(?policy, "execution policy");
        policy
    }

    /// Worker count to split `total` points across, or `None` to run serially.
    #[cfg(feature = "parallel")]
    pub(crate) fn parallel_threads(&self, total: usize) -> Option<usize> {
        if self.strategy != Strategy::Parallel || total <= self.min_parallel_len {
            return None;
        }
        let nthreads = rayon::current_num_threads();
        (nthreads > 1).then_some(nthreads)
    }
}
