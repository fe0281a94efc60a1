pub mod normal;
pub mod gbm;
pub mod black_scholes;

/// Source of independent standard-normal variates.
/// One source is owned by exactly one worker; it never crosses threads mid-run.
pub trait NormalSource {
    /// Draw from N(0, 1).
    fn next_normal(&mut self) -> f64;
}

/// Builds one independent normal stream per simulation partition.
///
/// `source_for_partition(i)` must be a pure function of `i` (plus the factory's own
/// configuration) so a partition produces the same draws on whichever worker runs it.
/// Send + Sync required for sharing across the rayon pool.
pub trait NormalSourceFactory: Send + Sync {
    type Source: NormalSource;

    fn source_for_partition(&self, partition: usize) -> Self::Source;
}
