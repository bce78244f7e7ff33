//! Report generation port trait.

use crate::domain::error::SimtraderError;
use crate::domain::position::Trade;
use crate::domain::session_config::SessionConfig;
use crate::session::SessionSnapshot;

/// Port for writing end-of-session reports. `trades` is the full trade log
/// in execution order; the snapshot only carries the most recent entries.
pub trait ReportPort {
    fn write(
        &self,
        snapshot: &SessionSnapshot,
        trades: &[Trade],
        config: &SessionConfig,
        output_path: &str,
    ) -> Result<(), SimtraderError>;
}
