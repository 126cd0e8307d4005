use std::sync::mpsc;

/// Advisory progress of a long-running stage.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    pub stage: String,
    /// Overall completion of the stage in `0.0..=1.0`.
    pub fraction: f32,
}

impl ProgressEvent {
    pub fn new(stage: impl Into<String>, fraction: f32) -> Self {
        Self {
            stage: stage.into(),
            fraction: fraction.clamp(0.0, 1.0),
        }
    }
}

pub struct EventSender<T> {
    tx: mpsc::Sender<T>,
}

pub struct EventReceiver<T> {
    rx: mpsc::Receiver<T>,
}

pub fn channel<T>() -> (EventSender<T>, EventReceiver<T>) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, EventReceiver { rx })
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> EventSender<T> {
    /// Sends an event; a dropped receiver is not an error for advisory events.
    pub fn send(&self, event: T) -> bool {
        self.tx.send(event).is_ok()
    }
}

impl<T> EventReceiver<T> {
    pub fn iter(&self) -> mpsc::Iter<'_, T> {
        self.rx.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{channel, ProgressEvent};

    #[test]
    fn events_arrive_in_send_order() {
        let (tx, rx) = channel();
        assert!(tx.send(ProgressEvent::new("fill", 0.5)));
        assert!(tx.clone().send(ProgressEvent::new("fill", 1.0)));

        drop(tx);

        let events: Vec<_> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].fraction, 0.5);
        assert_eq!(events[1].fraction, 1.0);
    }

    #[test]
    fn fraction_is_clamped_and_dropped_receiver_is_tolerated() {
        assert_eq!(ProgressEvent::new("x", 1.7).fraction, 1.0);

        let (tx, rx) = channel::<ProgressEvent>();
        drop(rx);
        assert!(!tx.send(ProgressEvent::new("x", 0.1)));
    }
}
