use crate::model::SweepReport;

/// Receives a finished report for display or export.
///
/// The engine never calls a sink itself; callers hand the report over once
/// `sweep` returns.
pub trait ReportSink {
    type Error;

    fn emit(&mut self, report: &SweepReport) -> Result<(), Self::Error>;
}

/// Keeps every report it receives. Useful when embedding the engine.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub reports: Vec<SweepReport>,
}

impl ReportSink for CollectSink {
    type Error = std::convert::Infallible;

    fn emit(&mut self, report: &SweepReport) -> Result<(), Self::Error> {
        self.reports.push(report.clone());
        Ok(())
    }
}
