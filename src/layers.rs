// SPDX-License-Identifier: BSD-3-Clause
//! `tracing` layers for profiling
use std::time::{Duration, Instant};

use tracing::{span, Id, Subscriber};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

/// Time spent inside a span, over all of its entries
#[derive(Debug)]
struct Busy {
    entered: Option<Instant>,
    total: Duration,
}

/// Prints the time each span was entered for, in nanoseconds, to stderr when
/// the span closes.
#[derive(Debug, Default)]
pub struct SpanTimeLayer;

impl<S> Layer<S> for SpanTimeLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, _attrs: &span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(Busy {
                entered: None,
                total: Duration::ZERO,
            });
        }
    }

    fn on_enter(&self, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            if let Some(busy) = span.extensions_mut().get_mut::<Busy>() {
                busy.entered = Some(Instant::now());
            }
        }
    }

    fn on_exit(&self, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            if let Some(busy) = span.extensions_mut().get_mut::<Busy>() {
                if let Some(t) = busy.entered.take() {
                    busy.total += t.elapsed();
                }
            }
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(&id) {
            if let Some(busy) = span.extensions().get::<Busy>() {
                eprintln!("{}: {}", span.name(), busy.total.as_nanos())
            }
        }
    }
}
