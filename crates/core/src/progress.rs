use std::cell::RefCell;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    Start { iterations: usize },
    Advance { epoch: usize, fraction: f32 },
    Finish { epochs: usize },
}

pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

thread_local! {
    static SINK: RefCell<Option<ProgressSink>> = const { RefCell::new(None) };
}

pub struct ProgressGuard {
    prev: Option<ProgressSink>,
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        let prev = self.prev.take();
        SINK.with(|sink| {
            *sink.borrow_mut() = prev;
        });
    }
}

/// Routes progress events on this thread to `sink` until the guard drops.
pub fn set_progress_sink(sink: Option<ProgressSink>) -> ProgressGuard {
    let prev = SINK.with(|current| std::mem::replace(&mut *current.borrow_mut(), sink));
    ProgressGuard { prev }
}

pub fn report(event: ProgressEvent) {
    let event = match event {
        ProgressEvent::Advance { epoch, fraction } => ProgressEvent::Advance {
            epoch,
            fraction: fraction.clamp(0.0, 1.0),
        },
        other => other,
    };
    SINK.with(|sink| {
        if let Some(sink) = sink.borrow().as_ref() {
            (sink)(event);
        }
    });
}
