use log::debug;

use crate::data::model::ProcessingProgress;

/// Forwards stage notifications to a caller callback.
///
/// Fractions are clamped to [0, 1] and never move backwards within one
/// invocation. The callback runs synchronously on the computing thread.
pub struct ProgressReporter<'a> {
    callback: &'a mut dyn FnMut(ProcessingProgress),
    last: f32,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(callback: &'a mut dyn FnMut(ProcessingProgress)) -> Self {
        Self {
            callback,
            last: 0.0,
        }
    }

    pub fn report(&mut self, stage: &'static str, fraction: f32, message: impl Into<String>) {
        let fraction = fraction.clamp(0.0, 1.0).max(self.last);
        self.last = fraction;
        let message = message.into();
        debug!("[{stage} {:>3.0}%] {message}", fraction * 100.0);
        (self.callback)(ProcessingProgress {
            stage,
            fraction,
            message,
        });
    }

    /// Last fraction reported.
    pub fn fraction(&self) -> f32 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions_never_decrease() {
        let mut seen = Vec::new();
        let mut callback = |p: ProcessingProgress| seen.push(p.fraction);
        let mut reporter = ProgressReporter::new(&mut callback);
        reporter.report("a", 0.4, "first");
        reporter.report("b", 0.2, "went backwards");
        reporter.report("c", 1.5, "overshoot");
        assert_eq!(reporter.fraction(), 1.0);
        drop(reporter);
        assert_eq!(seen, vec![0.4, 0.4, 1.0]);
    }
}
