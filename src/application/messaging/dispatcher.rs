//! Message dispatcher - one ordered queue per sender

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::conversation::ConversationRouter;
use crate::domain::entities::{Message, SenderId};
use crate::domain::traits::Bot;

/// A parsed message plus the chat its replies go to
#[derive(Debug, Clone)]
pub struct Inbound {
    pub chat: SenderId,
    pub message: Message,
}

struct Worker {
    queue: mpsc::UnboundedSender<Inbound>,
    handle: JoinHandle<()>,
}

/// Hands each message to its sender's worker task.
///
/// A worker handles its sender's messages strictly in arrival order and
/// sends the replies before taking the next one. Different senders never
/// wait for each other. A worker that stays idle for `idle` closes its queue,
/// finishes what is left and exits; the next message for that sender starts
/// a fresh worker that first waits for the old one.
pub struct MessageDispatcher<B: Bot + 'static> {
    bot: Arc<B>,
    router: Arc<ConversationRouter>,
    idle: Duration,
    workers: HashMap<SenderId, Worker>,
}

impl<B: Bot + 'static> MessageDispatcher<B> {
    pub fn new(bot: Arc<B>, router: Arc<ConversationRouter>, idle: Duration) -> Self {
        Self {
            bot,
            router,
            idle,
            workers: HashMap::new(),
        }
    }

    /// Queues `inbound` without waiting for it to be handled
    pub fn dispatch(&mut self, inbound: Inbound) {
        let sender = inbound.message.sender;
        let inbound = match self.workers.get(&sender) {
            Some(worker) => match worker.queue.send(inbound) {
                Ok(()) => return,
                // The worker went idle and closed its queue.
                Err(mpsc::error::SendError(inbound)) => inbound,
            },
            None => inbound,
        };

        let previous = self.workers.remove(&sender).map(|w| w.handle);
        let worker = self.spawn(sender, previous);
        if worker.queue.send(inbound).is_err() {
            tracing::error!(sender = %sender, "Worker exited before its first message");
        }
        self.workers.insert(sender, worker);
    }

    /// Forgets workers that have exited. Returns how many are still running.
    pub fn prune(&mut self) -> usize {
        self.workers.retain(|_, w| !w.handle.is_finished());
        self.workers.len()
    }

    fn spawn(&self, sender: SenderId, previous: Option<JoinHandle<()>>) -> Worker {
        let (queue, mut rx) = mpsc::unbounded_channel::<Inbound>();
        let bot = self.bot.clone();
        let router = self.router.clone();
        let idle = self.idle;

        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    tracing::error!(sender = %sender, "Previous worker failed: {}", e);
                }
            }
            loop {
                match tokio::time::timeout(idle, rx.recv()).await {
                    Ok(Some(inbound)) => deliver(bot.as_ref(), &router, inbound).await,
                    Ok(None) => break,
                    Err(_) => {
                        rx.close();
                        while let Some(inbound) = rx.recv().await {
                            deliver(bot.as_ref(), &router, inbound).await;
                        }
                        break;
                    }
                }
            }
            tracing::debug!(sender = %sender, "Worker idle, exiting");
        });

        Worker { queue, handle }
    }
}

/// Routes one message and sends its replies in order. Send failures are
/// logged and skipped.
pub async fn deliver<B: Bot + ?Sized>(bot: &B, router: &ConversationRouter, inbound: Inbound) {
    let sender = inbound.message.sender;
    for reply in router.handle(&inbound.message).await {
        if let Err(e) = bot.send_reply(inbound.chat, &reply).await {
            tracing::error!(sender = %sender, "Failed to send reply: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::{BotError, PanelError};
    use crate::domain::entities::{ConfigRecord, PanelCredentials, Reply};
    use crate::domain::traits::{BotInfo, ConfigStore, PanelChecker};
    use crate::infrastructure::storage::JsonConfigStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBot {
        sent: Mutex<Vec<(SenderId, String)>>,
    }

    #[async_trait]
    impl Bot for RecordingBot {
        async fn start(&self) -> Result<(), BotError> {
            Ok(())
        }

        async fn send_message(&self, chat_id: SenderId, text: &str) -> Result<String, BotError> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok("1".into())
        }

        async fn send_reply(&self, chat_id: SenderId, reply: &Reply) -> Result<String, BotError> {
            self.send_message(chat_id, &reply.text).await
        }

        fn bot_info(&self) -> BotInfo {
            BotInfo { id: "0".into(), name: "test".into(), username: "test_bot".into() }
        }
    }

    struct SlowPanel(Duration);

    #[async_trait]
    impl PanelChecker for SlowPanel {
        async fn verify(&self, _credentials: &PanelCredentials) -> Result<(), PanelError> {
            tokio::time::sleep(self.0).await;
            Ok(())
        }
    }

    fn inbound(sender: i64, text: &str) -> Inbound {
        let message = crate::application::messaging::MessageParser::default().parse(SenderId(sender), text);
        Inbound { chat: SenderId(sender), message }
    }

    fn setup(idle: Duration) -> (Arc<RecordingBot>, Arc<JsonConfigStore>, MessageDispatcher<RecordingBot>) {
        let record = ConfigRecord {
            admins: vec![SenderId(1), SenderId(2)],
            ..ConfigRecord::default()
        };
        let store = Arc::new(JsonConfigStore::with_record(record));
        let router = Arc::new(ConversationRouter::new(
            store.clone(),
            Arc::new(SlowPanel(Duration::from_millis(150))),
            None,
        ));
        let bot = Arc::new(RecordingBot::default());
        let dispatcher = MessageDispatcher::new(bot.clone(), router, idle);
        (bot, store, dispatcher)
    }

    async fn wait_for_replies(bot: &RecordingBot, count: usize) {
        for _ in 0..100 {
            if bot.sent.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("only {} replies arrived", bot.sent.lock().unwrap().len());
    }

    #[tokio::test]
    async fn test_one_sender_is_handled_in_arrival_order() {
        let (bot, store, mut dispatcher) = setup(Duration::from_secs(5));

        for text in ["/create_config", "panel.example.com", "admin", "pw", "/set_general_limit_number", "4"] {
            dispatcher.dispatch(inbound(1, text));
        }
        // prompt x3, checking + saved, prompt, saved
        wait_for_replies(&bot, 7).await;

        let sent = bot.sent.lock().unwrap().clone();
        assert!(sent[3].1.contains("Checking"));
        assert!(sent[4].1.contains("Panel settings saved"));
        assert!(sent[5].1.contains("General limit"));
        assert!(sent[6].1.contains("<code>4</code>"));

        let record = store.get_config().await.unwrap();
        assert_eq!(record.panel_domain.as_deref(), Some("panel.example.com"));
        assert_eq!(record.general_limit, 4);
    }

    #[tokio::test]
    async fn test_slow_sender_does_not_block_others() {
        let (bot, _store, mut dispatcher) = setup(Duration::from_secs(5));

        for text in ["/create_config", "panel.example.com", "admin", "pw"] {
            dispatcher.dispatch(inbound(1, text));
        }
        wait_for_replies(&bot, 3).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        dispatcher.dispatch(inbound(2, "/admins_list"));

        // Sender 2 answers while sender 1 still waits on the panel.
        wait_for_replies(&bot, 4).await;
        let sent = bot.sent.lock().unwrap().clone();
        assert_eq!(sent[3].0, SenderId(2));
        assert!(sent[3].1.contains("Active admins"));

        wait_for_replies(&bot, 6).await;
        assert!(bot.sent.lock().unwrap()[5].1.contains("Panel settings saved"));
    }

    /// Bot whose every send fails
    #[derive(Default)]
    struct DownBot {
        attempts: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl Bot for DownBot {
        async fn start(&self) -> Result<(), BotError> {
            Ok(())
        }

        async fn send_message(&self, _chat_id: SenderId, _text: &str) -> Result<String, BotError> {
            self.attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(BotError::Network("connection reset".into()))
        }

        async fn send_reply(&self, chat_id: SenderId, reply: &Reply) -> Result<String, BotError> {
            self.send_message(chat_id, &reply.text).await
        }

        fn bot_info(&self) -> BotInfo {
            BotInfo { id: "0".into(), name: "down".into(), username: "down_bot".into() }
        }
    }

    #[tokio::test]
    async fn test_failed_send_does_not_drop_later_replies() {
        let (_, store, _) = setup(Duration::from_secs(5));
        let router = ConversationRouter::new(store.clone(), Arc::new(SlowPanel(Duration::ZERO)), None);
        let bot = DownBot::default();

        for text in ["/create_config", "panel.example.com", "admin", "pw"] {
            deliver(&bot, &router, inbound(1, text)).await;
        }
        // Checking and saved are both attempted.
        assert_eq!(bot.attempts.load(std::sync::atomic::Ordering::SeqCst), 5);
        assert!(store.get_config().await.unwrap().panel_credentials().is_some());
    }

    #[tokio::test]
    async fn test_idle_worker_is_replaced() {
        let (bot, _store, mut dispatcher) = setup(Duration::from_millis(30));

        dispatcher.dispatch(inbound(1, "/set_check_interval"));
        wait_for_replies(&bot, 1).await;
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(dispatcher.prune(), 0);

        // The dialogue lives in the router, not in the worker.
        dispatcher.dispatch(inbound(1, "300"));
        wait_for_replies(&bot, 2).await;
        assert!(bot.sent.lock().unwrap()[1].1.contains("<code>300</code>"));
    }
}
