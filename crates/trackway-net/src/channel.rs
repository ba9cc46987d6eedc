//! Ordered command channel.
//!
//! Every connection's read loop and the operator console push [`Envelope`]s
//! into one unbounded FIFO. A single consumer ([`Dispatcher`](crate::Dispatcher))
//! drains it and fully handles each envelope before taking the next, which is
//! the only place game state is touched.

use tokio::sync::mpsc;
use trackway_game::PlayerId;

/// Who produced an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A registered client.
    Client(PlayerId),
    /// The operator console.
    Console,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// One raw inbound line.
    Line(String),
    /// The client's connection ended. Always the last event for that client.
    Closed,
}

/// One queued item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Producer.
    pub origin: Origin,
    /// Payload.
    pub event: Event,
}

/// Receiving end, owned by the consumer.
pub type CommandReceiver = mpsc::UnboundedReceiver<Envelope>;

/// Cloneable producer handle. Sending never blocks.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl CommandSender {
    /// Queue a line from a client. Returns `false` once the consumer is gone.
    pub fn client_line(&self, id: PlayerId, line: String) -> bool {
        self.push(Origin::Client(id), Event::Line(line))
    }

    /// Queue a client's disconnect.
    pub fn client_closed(&self, id: PlayerId) -> bool {
        self.push(Origin::Client(id), Event::Closed)
    }

    /// Queue an operator console line.
    pub fn console_line(&self, line: String) -> bool {
        self.push(Origin::Console, Event::Line(line))
    }

    fn push(&self, origin: Origin, event: Event) -> bool {
        self.tx.send(Envelope { origin, event }).is_ok()
    }
}

/// Create the channel.
pub fn command_channel() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_across_producers() {
        let (tx, mut rx) = command_channel();
        let tx2 = tx.clone();

        assert!(tx.client_line(PlayerId(1), "READY".into()));
        assert!(tx2.console_line("LIST".into()));
        assert!(tx.client_closed(PlayerId(1)));

        assert_eq!(
            rx.recv().await.unwrap(),
            Envelope {
                origin: Origin::Client(PlayerId(1)),
                event: Event::Line("READY".into())
            }
        );
        assert_eq!(rx.recv().await.unwrap().origin, Origin::Console);
        assert_eq!(rx.recv().await.unwrap().event, Event::Closed);
    }

    #[tokio::test]
    async fn test_send_after_consumer_dropped() {
        let (tx, rx) = command_channel();
        drop(rx);
        assert!(!tx.console_line("LIST".into()));
    }

    #[tokio::test]
    async fn test_concurrent_producers_keep_per_producer_order() {
        let (tx, mut rx) = command_channel();
        let mut tasks = Vec::new();
        for id in 1..=4u64 {
            let tx = tx.clone();
            tasks.push(tokio::spawn(async move {
                for n in 0..50 {
                    tx.client_line(PlayerId(id), n.to_string());
                }
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        drop(tx);

        let mut next = [0u32; 5];
        while let Some(env) = rx.recv().await {
            let (Origin::Client(PlayerId(id)), Event::Line(line)) = (env.origin, env.event) else {
                panic!("unexpected envelope");
            };
            assert_eq!(line, next[id as usize].to_string());
            next[id as usize] += 1;
        }
        assert_eq!(&next[1..], &[50, 50, 50, 50]);
    }
}
