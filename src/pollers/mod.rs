// =============================================================================
// Pollers — one per remote source, fully independent of each other
// =============================================================================
//
// Each poller owns its Scheduler, its StateCell, and a trait handle to the
// source it polls. No mutable state is shared between pollers; a failure in
// one never touches another's state.

pub mod forecast;
pub mod series;
pub mod ticker;

pub use forecast::{ForecastPoller, ForecastSource};
pub use series::{SeriesPoller, SeriesSource};
pub use ticker::{TickerPoller, TickerSource};
