//! Pipeline instrumentation.
//!
//! `trace_span!` wraps a whole stage (a batch, one NMS pass) and
//! `trace_event!` reports counts at a chosen level: `info` for per-call
//! totals, `debug` for per-image and per-cluster detail. Without the
//! `tracing` feature both expand to no-ops and the field values are still
//! evaluated, so call sites stay free of `cfg` attributes.

#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info_span!($name $(, $key = $value)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:literal $(, $key:ident = $value:expr)* $(,)?) => {{
        let _ = ($($value,)*);
        $crate::trace::StageGuard
    }};
}

#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($level:ident, $name:literal, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::$level!(name: $name, $($key = $value),+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($level:ident, $name:literal, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($($value,)+);
    };
}

pub(crate) use trace_event;
pub(crate) use trace_span;

/// Guard returned by `trace_span!` when tracing is compiled out.
#[cfg(not(feature = "tracing"))]
pub(crate) struct StageGuard;

#[cfg(not(feature = "tracing"))]
impl StageGuard {
    #[inline]
    pub(crate) fn entered(self) -> Self {
        self
    }
}
