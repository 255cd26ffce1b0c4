//! Reply texts. All text is Telegram HTML; user-supplied values are escaped.

use html_escape::encode_text;

use super::flow::{FlowId, FlowState};
use crate::application::errors::FlowError;
use crate::domain::entities::{CountryCode, Keyboard, PanelCredentials, Reply, SenderId};

pub const BACKUP_CAPTION: &str = "💾 <b>Configuration backup</b>\n\n🔒 Keep this file somewhere safe.";

const START_MESSAGE: &str = "🌟 <b>Welcome to the panel management bot!</b> 🌟
🛡️ <b>Spernet</b> v1.0

<b>Start the bot</b>
🚀 /start

<b>Panel settings (domain, username, password)</b>
⚙️ /create_config

<b>Set a special limit for one user</b>
🎯 /set_special_limit
Example: test_user may use at most 5 IPs

<b>Show special limits</b>
📊 /show_special_limit

<b>Add a bot admin</b>
👤 /add_admin

<b>List admins</b>
👥 /admins_list

<b>Remove a bot admin</b>
❌ /remove_admin

<b>Country filter - only IPs from this country are counted</b>
🌍 /country_code

<b>Add a user to the exception list (no limit)</b>
✅ /set_except_user

<b>Remove a user from the exception list</b>
🚫 /remove_except_user

<b>Show exception users</b>
📋 /show_except_users

<b>General limit (users without a special limit)</b>
📈 /set_general_limit_number

<b>Check interval</b>
⏱️ /set_check_interval

<b>Active-user window</b>
🕐 /set_time_to_active_users

<b>Send 'config.json' as a backup</b>
💾 /backup";

const DOMAIN_PROMPT: &str = "🌐 <b>Send your panel address</b>\n\n\
    📝 Domain or IP with port, for example <code>sub.domain.com:8333</code> or <code>95.12.153.87:443</code>\n\n\
    ⚠️ <b>Without</b> <code>https://</code> or <code>http://</code>";

pub fn start() -> Reply {
    Reply::new(START_MESSAGE).with_keyboard(Keyboard::Main)
}

pub fn about() -> Reply {
    Reply::new(
        "🛡️ <b>Spernet</b>\n\
         Smart user monitoring and IP limiting.\n\
         Bot version: <b>1.0</b>\n\n\
         Get started: /start\n\
         Quick setup: /create_config\n\
         Backup: /backup",
    )
    .with_keyboard(Keyboard::Main)
}

pub fn access_denied() -> Reply {
    Reply::new(
        "🚫 <b>Access denied!</b>\n\n\
         You are not allowed to run this command.\n\
         Please contact the main admin.",
    )
    .with_keyboard(Keyboard::Remove)
}

/// The question asked on entering `state` of `flow`
pub fn prompt(flow: FlowId, state: FlowState) -> Reply {
    let text: String = match state {
        FlowState::ConfirmOverwrite => "❓ Do you want to change these settings?".into(),
        FlowState::Domain if flow == FlowId::ConfigurePanel => format!("⚙️ <b>Panel setup</b>\n\n{}", DOMAIN_PROMPT),
        FlowState::Domain => DOMAIN_PROMPT.into(),
        FlowState::PanelUsername => "👤 <b>Panel username</b>\n\nSend your username, for example <code>admin</code>".into(),
        FlowState::PanelPassword => "🔐 <b>Panel password</b>\n\nSend your password, for example <code>admin1234</code>".into(),
        FlowState::ChatId if flow == FlowId::RemoveAdmin => {
            "❌ <b>Remove admin</b>\n\n📱 Send the chat ID of the admin to remove:".into()
        }
        FlowState::ChatId => "👤 <b>Add admin</b>\n\n📱 Send the chat ID of the new admin:".into(),
        FlowState::LimitUsername => "🎯 <b>Special limit</b>\n\n👤 Send the username, for example <code>Test_User</code>".into(),
        FlowState::LimitNumber => "🔢 Send the number of IPs allowed for this user, for example <code>4</code> or <code>2</code>".into(),
        FlowState::CountryChoice => "🌍 <b>Country filter</b>\n\n\
            1. Iran 🇮🇷\n2. Russia 🇷🇺\n3. China 🇨🇳\n4. None 🌐\n\n\
            📝 Send only the number, for example <code>2</code> or <code>1</code>"
            .into(),
        FlowState::ExceptUsername if flow == FlowId::RemoveExceptUser => {
            "🚫 <b>Remove exception</b>\n\n👤 Send the username to remove from the exception list:".into()
        }
        FlowState::ExceptUsername => "✅ <b>Add exception</b>\n\n👤 Send the username.\n\n\
            💡 <b>Note:</b> users in this list have no limit at all."
            .into(),
        FlowState::GeneralLimit => "📈 <b>General limit</b>\n\nSend the number of IPs allowed per user.\n\n\
            💡 <b>Note:</b> applies to users without a special limit."
            .into(),
        FlowState::CheckInterval => "⏱️ <b>Check interval</b>\n\nSend the interval in seconds.\n\n\
            💡 <b>Recommended:</b> 240 seconds."
            .into(),
        FlowState::ActiveWindow => "🕐 <b>Active-user window</b>\n\nSend the window length.\n\n\
            💡 <b>Note:</b> the value is in seconds."
            .into(),
    };
    let keyboard = match state {
        FlowState::ConfirmOverwrite => Keyboard::Confirm,
        _ => Keyboard::Remove,
    };
    Reply::new(text).with_keyboard(keyboard)
}

pub fn existing_panel(credentials: &PanelCredentials) -> Vec<Reply> {
    vec![
        Reply::new("⚙️ <b>Existing settings!</b>\n\nThe panel is already configured."),
        Reply::new(
            "⚠️ <b>Important:</b>\n\n\
             After changing the panel settings the bot must be <b>restarted</b>.\n\
             Only this command needs a restart.",
        ),
        Reply::new(format!(
            "📋 <b>Current settings:</b>\n\n\
             🌐 Domain: <code>{}</code>\n\
             👤 Username: <code>{}</code>\n\
             🔐 Password: <code>{}</code>",
            encode_text(&credentials.domain),
            encode_text(&credentials.username),
            credentials.masked_password(),
        )),
        prompt(FlowId::ConfigurePanel, FlowState::ConfirmOverwrite),
    ]
}

pub fn overwrite_declined() -> Reply {
    Reply::new("👍 Settings unchanged.\n\nWhen you decide to change them, use <b>/create_config</b>.")
        .with_keyboard(Keyboard::Main)
}

pub fn panel_checking() -> Reply {
    Reply::new("⏳ <b>Checking...</b>\n\nVerifying the panel address, username and password...")
}

pub fn panel_saved() -> Reply {
    Reply::new(
        "✅ <b>Panel settings saved!</b>\n\n\
         You can now use every feature of the bot. 🚀",
    )
    .with_keyboard(Keyboard::Main)
}

pub fn panel_rejected(credentials: &PanelCredentials, reason: &str) -> Reply {
    Reply::new(format!(
        "❌ <b>Could not log in to the panel!</b>\n\n\
         🌐 Panel address: <code>{}</code>\n\
         👤 Username: <code>{}</code>\n\
         ⚠️ {}\n\n\
         The previous settings were kept.\n\
         🔄 Try again: /create_config",
        encode_text(&credentials.domain),
        encode_text(&credentials.username),
        encode_text(reason),
    ))
    .with_keyboard(Keyboard::Main)
}

pub fn admin_added(id: SenderId) -> Reply {
    Reply::new(format!("✅ <b>Done!</b>\n\nAdmin <code>{}</code> was added! 🎉", id)).with_keyboard(Keyboard::Main)
}

pub fn admin_removed(id: SenderId) -> Reply {
    Reply::new(format!("✅ <b>Removed!</b>\n\nAdmin <code>{}</code> was removed! 🗑️", id))
        .with_keyboard(Keyboard::Main)
}

pub fn admins_list(admins: &[SenderId]) -> Reply {
    if admins.is_empty() {
        return Reply::new("❌ <b>No admins found!</b>").with_keyboard(Keyboard::Main);
    }
    let list = admins
        .iter()
        .map(|a| format!("📌 {}", a))
        .collect::<Vec<_>>()
        .join("\n");
    Reply::new(format!(
        "👥 <b>Active admins:</b>\n\n{}\n\n🔢 Total: {} admin(s)",
        list,
        admins.len()
    ))
    .with_keyboard(Keyboard::Main)
}

pub fn special_limit_updated(username: &str) -> Reply {
    Reply::new(format!(
        "⚠️ <b>Limit updated</b>\n\nUser <code>{}</code> already had a special limit.\nIt now has the new value! ✅",
        encode_text(username)
    ))
}

pub fn special_limit_set(username: &str, limit: u32) -> Reply {
    Reply::new(format!(
        "👤 User: <code>{}</code>\n🔢 Limit: <code>{}</code> IP\n\nSpecial limit saved! 🎉",
        encode_text(username),
        limit
    ))
    .with_keyboard(Keyboard::Main)
}

/// Header plus one message per entry
pub fn special_limits(limits: &[(String, u32)]) -> Vec<Reply> {
    if limits.is_empty() {
        return vec![Reply::new(
            "📭 <b>No special limits yet.</b>\n\nUse /set_special_limit to add one.",
        )
        .with_keyboard(Keyboard::Main)];
    }
    let mut replies = vec![Reply::new("📊 <b>Special limits:</b>").with_keyboard(Keyboard::Main)];
    replies.extend(
        limits
            .iter()
            .map(|(user, limit)| Reply::new(format!("🎯 {}: {}", encode_text(user), limit))),
    );
    replies
}

pub fn country_set(code: CountryCode) -> Reply {
    Reply::new(format!(
        "✅ <b>Country saved!</b>\n\n🌍 Country code <code>{}</code> is now active!",
        code.label()
    ))
    .with_keyboard(Keyboard::Main)
}

pub fn except_user_added(username: &str) -> Reply {
    Reply::new(format!(
        "✅ <b>Added!</b>\n\nUser <code>{}</code> is now on the exception list! 🎉",
        encode_text(username)
    ))
    .with_keyboard(Keyboard::Main)
}

pub fn except_user_removed(username: &str) -> Reply {
    Reply::new(format!(
        "✅ <b>Removed!</b>\n\nUser <code>{}</code> was removed from the exception list! 🗑️",
        encode_text(username)
    ))
    .with_keyboard(Keyboard::Main)
}

/// Header plus one message per user
pub fn except_users(users: &[String]) -> Vec<Reply> {
    if users.is_empty() {
        return vec![Reply::new(
            "📭 <b>The exception list is empty.</b>\n\nUse /set_except_user to add a user.",
        )
        .with_keyboard(Keyboard::Main)];
    }
    let mut replies = vec![Reply::new(
        "📋 <b>Exception users:</b>\n\n✅ These users have no limit:",
    )
    .with_keyboard(Keyboard::Main)];
    replies.extend(users.iter().map(|u| Reply::new(format!("👤 {}", encode_text(u)))));
    replies
}

pub fn general_limit_set(limit: u32) -> Reply {
    Reply::new(format!(
        "✅ <b>General limit saved!</b>\n\n📈 General limit is now <code>{}</code>! 🎉",
        limit
    ))
    .with_keyboard(Keyboard::Main)
}

pub fn check_interval_set(seconds: u64) -> Reply {
    Reply::new(format!(
        "✅ <b>Check interval saved!</b>\n\n⏱️ Users are checked every <code>{}</code> seconds! 🎉",
        seconds
    ))
    .with_keyboard(Keyboard::Main)
}

pub fn active_window_set(seconds: u64) -> Reply {
    Reply::new(format!(
        "✅ <b>Active window saved!</b>\n\n🕐 Active-user window is now <code>{}</code> seconds! 🎉",
        seconds
    ))
    .with_keyboard(Keyboard::Main)
}

/// The user-facing rendering of a failed dialogue
pub fn flow_error(err: &FlowError) -> Reply {
    let text = match err {
        FlowError::AuthorizationDenied => return access_denied(),
        FlowError::Validation { value, retry } => format!(
            "❌ <b>Invalid input!</b>\n\n\
             Value received: <code>{}</code>\n\
             Please try again: <b>/{}</b>",
            encode_text(value),
            retry
        ),
        FlowError::DuplicateEntity(what) => {
            format!("⚠️ <b>Already exists!</b>\n\n<code>{}</code> is already on the list!", encode_text(what))
        }
        FlowError::NotFound(what) => {
            format!("❌ <b>Not found!</b>\n\n<code>{}</code> does not exist!", encode_text(what))
        }
        FlowError::CapacityExceeded(reason) => format!("⚠️ <b>Limit reached!</b>\n\n{}", reason),
        FlowError::ExternalStoreUnavailable { reason, retry } => format!(
            "❌ <b>Something went wrong!</b>\n\n{}\n\n🔄 Try again: /{}",
            encode_text(reason),
            retry
        ),
    };
    Reply::new(text).with_keyboard(Keyboard::Main)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_reply_escapes_value() {
        let reply = flow_error(&FlowError::validation("<b>x", "set_check_interval"));
        assert!(reply.text.contains("&lt;b&gt;x"));
        assert!(reply.text.contains("/set_check_interval"));
        assert_eq!(reply.keyboard, Keyboard::Main);
    }

    #[test]
    fn test_denied_hides_keyboard() {
        assert_eq!(flow_error(&FlowError::AuthorizationDenied).keyboard, Keyboard::Remove);
    }

    #[test]
    fn test_existing_panel_masks_password() {
        let replies = existing_panel(&PanelCredentials::new("p.example.com:443", "root", "s3cret"));
        assert_eq!(replies.len(), 4);
        assert!(replies.iter().all(|r| !r.text.contains("s3cret")));
        assert_eq!(replies[3].keyboard, Keyboard::Confirm);
    }

    #[test]
    fn test_listing_is_one_message_per_entry() {
        let replies = special_limits(&[("a".into(), 1), ("b".into(), 2)]);
        assert_eq!(replies.len(), 3);
        assert_eq!(except_users(&[]).len(), 1);
    }
}
