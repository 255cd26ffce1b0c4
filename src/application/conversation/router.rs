//! Conversation router - resolves each inbound message against the admin
//! gate, the menu, the flow registry and the sender's session.

use std::sync::Arc;
use std::time::Duration;

use super::flow::{FieldValue, FlowDefinition, FlowId, FlowRegistry, FlowState};
use super::gate::{AdminGate, Authorization};
use super::menu::{MenuAction, MenuDispatcher};
use super::replies;
use super::session::{Session, SessionGuard, SessionStore};
use crate::application::errors::{FlowError, StorageError};
use crate::domain::entities::config_record::MAX_ADMINS;
use crate::domain::entities::{
    AdminAddition, AdminRemoval, Content, Keyboard, Message, PanelCredentials, Reply, SenderId,
};
use crate::domain::traits::{ConfigStore, PanelChecker};

/// The conversation orchestrator.
///
/// One router serves every sender. Events of one sender are handled one at a
/// time (the sender's session slot stays locked for the whole event); events
/// of different senders run concurrently.
pub struct ConversationRouter {
    gate: AdminGate,
    sessions: SessionStore,
    menu: MenuDispatcher,
    registry: &'static FlowRegistry,
    store: Arc<dyn ConfigStore>,
    panel: Arc<dyn PanelChecker>,
}

impl ConversationRouter {
    pub fn new(store: Arc<dyn ConfigStore>, panel: Arc<dyn PanelChecker>, idle_timeout: Option<Duration>) -> Self {
        Self {
            gate: AdminGate::new(store.clone()),
            sessions: SessionStore::new(idle_timeout),
            menu: MenuDispatcher::new(),
            registry: FlowRegistry::global(),
            store,
            panel,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handles one inbound message and returns the replies to send, in order.
    /// Never fails: every error becomes a reply.
    pub async fn handle(&self, message: &Message) -> Vec<Reply> {
        let sender = message.sender;
        let mut slot = self.sessions.lock(sender).await;
        tracing::debug!(
            sender = %sender,
            id = %message.id,
            platform = %message.platform,
            kind = message.content.kind(),
            "Routing message"
        );

        match self.route(&message.content, &mut slot).await {
            Ok(replies) => replies,
            Err(err) => {
                slot.clear();
                match &err {
                    FlowError::ExternalStoreUnavailable { .. } => {
                        tracing::error!(sender = %sender, "Dialogue aborted: {}", err)
                    }
                    FlowError::AuthorizationDenied | FlowError::Validation { .. } => {
                        tracing::warn!(sender = %sender, "Dialogue aborted: {}", err)
                    }
                    _ => tracing::info!(sender = %sender, "Dialogue ended: {}", err),
                }
                vec![replies::flow_error(&err)]
            }
        }
    }

    /// Convenience for transports that only have a sender and raw text
    pub async fn handle_text(&self, sender: SenderId, text: &str) -> Vec<Reply> {
        let content = crate::application::messaging::MessageParser::default().parse_content(text);
        self.handle(&Message::new(sender, content)).await
    }

    async fn route(&self, content: &Content, slot: &mut SessionGuard) -> Result<Vec<Reply>, FlowError> {
        match content {
            // Any command ends the current dialogue; unknown ones fall back to start.
            Content::Command { name, .. } => {
                let flow = self
                    .registry
                    .by_command(name)
                    .map(|def| def.id)
                    .unwrap_or(FlowId::Start);
                slot.clear();
                self.enter(flow, slot).await
            }
            Content::Text(text) => match self.menu.lookup(text) {
                Some(MenuAction::Rewrite(token)) => self.feed(token, slot).await,
                Some(MenuAction::Enter(flow)) => {
                    slot.clear();
                    self.enter(flow, slot).await
                }
                Some(MenuAction::Navigate { text, keyboard }) => {
                    slot.clear();
                    self.require_admin(slot.sender()).await?;
                    Ok(vec![Reply::new(text).with_keyboard(keyboard)])
                }
                None => self.feed(text, slot).await,
            },
            Content::Empty => Ok(Vec::new()),
        }
    }

    async fn require_admin(&self, sender: SenderId) -> Result<(), FlowError> {
        match self.gate.authorize(sender).await {
            Ok(Authorization::Allowed) => Ok(()),
            Ok(Authorization::Denied) => Err(FlowError::AuthorizationDenied),
            Err(e) => Err(FlowError::unavailable(e, "start")),
        }
    }

    /// Starts `flow`. Stateless flows finish here; the others open a session
    /// at their first state and reply with its prompt.
    async fn enter(&self, flow: FlowId, slot: &mut SessionGuard) -> Result<Vec<Reply>, FlowError> {
        let def = self.registry.get(flow);
        let sender = slot.sender();
        if def.requires_admin {
            self.require_admin(sender).await?;
        }
        tracing::info!(sender = %sender, flow = ?flow, "Entering flow");
        let store_err = unavailable(def.command);

        match flow {
            FlowId::Start => Ok(vec![replies::start()]),
            FlowId::About => Ok(vec![replies::about()]),
            FlowId::AdminsList => {
                let admins = self.store.get_admins().await.map_err(store_err)?;
                Ok(vec![replies::admins_list(&admins)])
            }
            FlowId::ShowSpecialLimits => {
                let limits = self.store.list_special_limits().await.map_err(store_err)?;
                Ok(replies::special_limits(&limits))
            }
            FlowId::ShowExceptUsers => {
                let users = self.store.list_except_users().await.map_err(store_err)?;
                Ok(replies::except_users(&users))
            }
            FlowId::Backup => self.backup().await,
            FlowId::ConfigurePanel => {
                let config = self.store.get_config().await.map_err(store_err)?;
                match config.panel_credentials() {
                    Some(existing) => {
                        slot.begin(flow, FlowState::ConfirmOverwrite);
                        Ok(replies::existing_panel(&existing))
                    }
                    None => {
                        slot.begin(flow, FlowState::Domain);
                        Ok(vec![replies::prompt(flow, FlowState::Domain)])
                    }
                }
            }
            FlowId::AddAdmin => {
                let count = self.store.get_admins().await.map_err(store_err)?.len();
                if count >= MAX_ADMINS {
                    return Err(admins_full());
                }
                Ok(begin_first(def, slot))
            }
            FlowId::RemoveAdmin => {
                let count = self.store.get_admins().await.map_err(store_err)?.len();
                if count <= 1 {
                    return Err(last_admin());
                }
                Ok(begin_first(def, slot))
            }
            _ => Ok(begin_first(def, slot)),
        }
    }

    /// Feeds free text to the active session, or shows the help text when
    /// there is none.
    async fn feed(&self, text: &str, slot: &mut SessionGuard) -> Result<Vec<Reply>, FlowError> {
        let Some(mut session) = slot.take() else {
            return self.enter(FlowId::Start, slot).await;
        };
        let def = self.registry.get(session.flow);
        if def.requires_admin {
            self.require_admin(slot.sender()).await?;
        }

        let state = session.state;
        let value = state.validator().validate(text, def.command)?;
        if value == FieldValue::Confirmed(false) {
            tracing::info!(sender = %slot.sender(), flow = ?def.id, "Overwrite declined");
            return Ok(vec![replies::overwrite_declined()]);
        }
        session.record(state.field(), value);

        match def.successor(state) {
            Some(next) => {
                session.advance(next);
                slot.put(session);
                Ok(vec![replies::prompt(def.id, next)])
            }
            None => {
                tracing::info!(sender = %slot.sender(), flow = ?def.id, "Completing flow");
                self.commit(&session, def).await
            }
        }
    }

    /// Applies a completed dialogue to the store. Runs once per dialogue:
    /// the session has already been taken out of its slot.
    async fn commit(&self, session: &Session, def: &FlowDefinition) -> Result<Vec<Reply>, FlowError> {
        let retry = def.command;
        let store_err = unavailable(retry);

        match session.flow {
            FlowId::ConfigurePanel => {
                let credentials = PanelCredentials::new(
                    required_text(session, FlowState::Domain, retry)?,
                    required_text(session, FlowState::PanelUsername, retry)?,
                    required_text(session, FlowState::PanelPassword, retry)?,
                );
                let mut out = vec![replies::panel_checking()];
                if let Err(e) = self.panel.verify(&credentials).await {
                    tracing::warn!(domain = %credentials.domain, "Panel check failed: {}", e);
                    out.push(replies::panel_rejected(&credentials, &e.to_string()));
                    return Ok(out);
                }
                self.store.set_panel_credentials(&credentials).await.map_err(store_err)?;
                tracing::info!(domain = %credentials.domain, "Panel credentials saved");
                out.push(replies::panel_saved());
                Ok(out)
            }
            FlowId::AddAdmin => {
                let id = required_chat_id(session, retry)?;
                match self.store.add_admin(id).await.map_err(store_err)? {
                    AdminAddition::Added => {
                        tracing::info!(admin = %id, "Admin added");
                        Ok(vec![replies::admin_added(id)])
                    }
                    AdminAddition::Duplicate => Err(FlowError::DuplicateEntity(id.to_string())),
                    AdminAddition::CapacityReached => Err(admins_full()),
                }
            }
            FlowId::RemoveAdmin => {
                let id = required_chat_id(session, retry)?;
                match self.store.remove_admin(id).await.map_err(store_err)? {
                    AdminRemoval::Removed => {
                        tracing::info!(admin = %id, "Admin removed");
                        Ok(vec![replies::admin_removed(id)])
                    }
                    AdminRemoval::NotFound => Err(FlowError::NotFound(id.to_string())),
                    AdminRemoval::LastAdmin => Err(last_admin()),
                }
            }
            FlowId::SetSpecialLimit => {
                let username = required_text(session, FlowState::LimitUsername, retry)?;
                let limit = required_u32(session, FlowState::LimitNumber, retry)?;
                let updated = self
                    .store
                    .upsert_special_limit(&username, limit)
                    .await
                    .map_err(store_err)?;
                let mut out = Vec::new();
                if updated {
                    out.push(replies::special_limit_updated(&username));
                }
                out.push(replies::special_limit_set(&username, limit));
                Ok(out)
            }
            FlowId::CountryCode => {
                let code = match session.fields.get(FlowState::CountryChoice.field()) {
                    Some(FieldValue::Country(code)) => *code,
                    _ => return Err(FlowError::validation("", retry)),
                };
                self.store.set_country_code(code).await.map_err(store_err)?;
                Ok(vec![replies::country_set(code)])
            }
            FlowId::SetExceptUser => {
                let username = required_text(session, FlowState::ExceptUsername, retry)?;
                if !self.store.add_except_user(&username).await.map_err(store_err)? {
                    return Err(FlowError::DuplicateEntity(username));
                }
                Ok(vec![replies::except_user_added(&username)])
            }
            FlowId::RemoveExceptUser => {
                let username = required_text(session, FlowState::ExceptUsername, retry)?;
                if !self.store.remove_except_user(&username).await.map_err(store_err)? {
                    return Err(FlowError::NotFound(username));
                }
                Ok(vec![replies::except_user_removed(&username)])
            }
            FlowId::SetGeneralLimit => {
                let limit = required_u32(session, FlowState::GeneralLimit, retry)?;
                self.store.set_general_limit(limit).await.map_err(store_err)?;
                Ok(vec![replies::general_limit_set(limit)])
            }
            FlowId::SetCheckInterval => {
                let seconds = required_number(session, FlowState::CheckInterval, retry)?;
                self.store.set_check_interval(seconds).await.map_err(store_err)?;
                Ok(vec![replies::check_interval_set(seconds)])
            }
            FlowId::SetTimeToActive => {
                let seconds = required_number(session, FlowState::ActiveWindow, retry)?;
                self.store.set_active_window(seconds).await.map_err(store_err)?;
                Ok(vec![replies::active_window_set(seconds)])
            }
            // Stateless flows finish in `enter` and never get here.
            FlowId::Start
            | FlowId::About
            | FlowId::AdminsList
            | FlowId::ShowSpecialLimits
            | FlowId::ShowExceptUsers
            | FlowId::Backup => Ok(vec![replies::start()]),
        }
    }

    async fn backup(&self) -> Result<Vec<Reply>, FlowError> {
        match self.store.backup().await {
            Ok(Some(mut document)) => {
                document.caption = Some(replies::BACKUP_CAPTION.to_string());
                Ok(vec![Reply::document(document, Keyboard::Main)])
            }
            Ok(None) => Err(FlowError::unavailable(
                "config.json was not found. Finish the setup first.",
                "create_config",
            )),
            Err(e) => Err(FlowError::unavailable(e, "backup")),
        }
    }
}

fn begin_first(def: &FlowDefinition, slot: &mut SessionGuard) -> Vec<Reply> {
    match def.first_state() {
        Some(state) => {
            slot.begin(def.id, state);
            vec![replies::prompt(def.id, state)]
        }
        None => vec![replies::start()],
    }
}

fn unavailable(retry: &'static str) -> impl Fn(StorageError) -> FlowError {
    move |e| FlowError::unavailable(e, retry)
}

fn admins_full() -> FlowError {
    FlowError::CapacityExceeded(format!(
        "At most <b>{}</b> admins are allowed.\nRemove one first: /remove_admin",
        MAX_ADMINS
    ))
}

fn last_admin() -> FlowError {
    FlowError::CapacityExceeded(
        "Only <b>1</b> admin is left.\nAdd a new admin before removing one: /add_admin".to_string(),
    )
}

fn required_text(session: &Session, state: FlowState, retry: &'static str) -> Result<String, FlowError> {
    session
        .text(state.field())
        .map(str::to_string)
        .ok_or_else(|| FlowError::validation("", retry))
}

fn required_number(session: &Session, state: FlowState, retry: &'static str) -> Result<u64, FlowError> {
    session
        .number(state.field())
        .ok_or_else(|| FlowError::validation("", retry))
}

fn required_u32(session: &Session, state: FlowState, retry: &'static str) -> Result<u32, FlowError> {
    let n = required_number(session, state, retry)?;
    u32::try_from(n).map_err(|_| FlowError::validation(n.to_string(), retry))
}

fn required_chat_id(session: &Session, retry: &'static str) -> Result<SenderId, FlowError> {
    let n = required_number(session, FlowState::ChatId, retry)?;
    i64::try_from(n)
        .map(SenderId)
        .map_err(|_| FlowError::validation(n.to_string(), retry))
}
