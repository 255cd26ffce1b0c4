//! Menu dispatcher - maps reply-keyboard button labels to actions

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::flow::FlowId;
use crate::domain::entities::Keyboard;

pub const ABOUT: &str = "🛡️ Spernet";
pub const PANEL_SETTINGS: &str = "⚙️ Panel Settings";
pub const SPECIAL_LIMIT: &str = "🎯 Special Limit";
pub const ADMIN_MANAGEMENT: &str = "👥 Admin Management";
pub const COUNTRY_SETTINGS: &str = "🌍 Country Settings";
pub const EXCEPTIONS: &str = "📋 Exceptions";
pub const GENERAL_SETTINGS: &str = "📊 General Settings";
pub const BACKUP: &str = "💾 Backup";
pub const HELP: &str = "📖 Help";

pub const ADD_ADMIN: &str = "➕ Add Admin";
pub const ADMIN_LIST: &str = "👥 Admin List";
pub const REMOVE_ADMIN: &str = "❌ Remove Admin";

pub const ADD_EXCEPTION: &str = "✅ Add Exception";
pub const EXCEPTION_LIST: &str = "📋 Exception List";
pub const REMOVE_EXCEPTION: &str = "🚫 Remove Exception";

pub const GENERAL_LIMIT: &str = "📈 General Limit";
pub const CHECK_INTERVAL: &str = "⏱️ Check Interval";
pub const ACTIVE_TIME: &str = "🕐 Active Time";

pub const BACK: &str = "🔙 Back";
pub const CONFIRM: &str = "✅ Yes";
pub const DENY: &str = "❌ No";

type Layout = &'static [&'static [&'static str]];

const MAIN_LAYOUT: Layout = &[
    &[ABOUT],
    &[PANEL_SETTINGS, SPECIAL_LIMIT],
    &[ADMIN_MANAGEMENT, COUNTRY_SETTINGS],
    &[EXCEPTIONS, GENERAL_SETTINGS],
    &[BACKUP, HELP],
];
const ADMINS_LAYOUT: Layout = &[&[ADD_ADMIN, ADMIN_LIST], &[REMOVE_ADMIN, BACK]];
const EXCEPTIONS_LAYOUT: Layout = &[&[ADD_EXCEPTION, EXCEPTION_LIST], &[REMOVE_EXCEPTION, BACK]];
const SETTINGS_LAYOUT: Layout = &[&[GENERAL_LIMIT, CHECK_INTERVAL], &[ACTIVE_TIME, BACK]];
const CONFIRM_LAYOUT: Layout = &[&[CONFIRM, DENY]];

/// What a button press does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Show a sub-menu: informational text plus another keyboard
    Navigate { text: &'static str, keyboard: Keyboard },
    /// Same as sending the flow's slash command
    Enter(FlowId),
    /// Replace the input with this token and hand it to the active dialogue
    Rewrite(&'static str),
}

static ACTIONS: Lazy<HashMap<&'static str, MenuAction>> = Lazy::new(|| {
    use MenuAction::*;
    HashMap::from([
        (HELP, Enter(FlowId::Start)),
        (ABOUT, Enter(FlowId::About)),
        (PANEL_SETTINGS, Enter(FlowId::ConfigurePanel)),
        (
            SPECIAL_LIMIT,
            Navigate {
                text: "🎯 <b>Special limits</b>\n\n\
                       ➕ /set_special_limit - set a new limit\n\
                       📊 /show_special_limit - list current limits",
                keyboard: Keyboard::Main,
            },
        ),
        (
            ADMIN_MANAGEMENT,
            Navigate {
                text: "👥 <b>Admin management</b>\n\nUse the buttons below:",
                keyboard: Keyboard::Admins,
            },
        ),
        (ADD_ADMIN, Enter(FlowId::AddAdmin)),
        (ADMIN_LIST, Enter(FlowId::AdminsList)),
        (REMOVE_ADMIN, Enter(FlowId::RemoveAdmin)),
        (COUNTRY_SETTINGS, Enter(FlowId::CountryCode)),
        (
            EXCEPTIONS,
            Navigate {
                text: "📋 <b>Exception users</b>\n\nUse the buttons below:",
                keyboard: Keyboard::Exceptions,
            },
        ),
        (ADD_EXCEPTION, Enter(FlowId::SetExceptUser)),
        (EXCEPTION_LIST, Enter(FlowId::ShowExceptUsers)),
        (REMOVE_EXCEPTION, Enter(FlowId::RemoveExceptUser)),
        (
            GENERAL_SETTINGS,
            Navigate {
                text: "📊 <b>General settings</b>\n\nUse the buttons below:",
                keyboard: Keyboard::Settings,
            },
        ),
        (GENERAL_LIMIT, Enter(FlowId::SetGeneralLimit)),
        (CHECK_INTERVAL, Enter(FlowId::SetCheckInterval)),
        (ACTIVE_TIME, Enter(FlowId::SetTimeToActive)),
        (BACKUP, Enter(FlowId::Backup)),
        (
            BACK,
            Navigate {
                text: "🏠 <b>Main menu</b>\n\nUse the buttons below for quick access:",
                keyboard: Keyboard::Main,
            },
        ),
        (CONFIRM, Rewrite("yes")),
        (DENY, Rewrite("no")),
    ])
});

/// Stateless lookup from exact button label to action
#[derive(Debug, Clone, Copy, Default)]
pub struct MenuDispatcher;

impl MenuDispatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn lookup(&self, label: &str) -> Option<MenuAction> {
        ACTIONS.get(label.trim()).copied()
    }

    /// Button rows for a keyboard, `None` for `Keep` and `Remove`
    pub fn layout(keyboard: Keyboard) -> Option<Layout> {
        match keyboard {
            Keyboard::Main => Some(MAIN_LAYOUT),
            Keyboard::Admins => Some(ADMINS_LAYOUT),
            Keyboard::Exceptions => Some(EXCEPTIONS_LAYOUT),
            Keyboard::Settings => Some(SETTINGS_LAYOUT),
            Keyboard::Confirm => Some(CONFIRM_LAYOUT),
            Keyboard::Keep | Keyboard::Remove => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_button_has_an_action() {
        for keyboard in [
            Keyboard::Main,
            Keyboard::Admins,
            Keyboard::Exceptions,
            Keyboard::Settings,
            Keyboard::Confirm,
        ] {
            for row in MenuDispatcher::layout(keyboard).unwrap() {
                for label in *row {
                    assert!(MenuDispatcher::new().lookup(label).is_some(), "{}", label);
                }
            }
        }
    }

    #[test]
    fn test_confirm_buttons_rewrite() {
        let menu = MenuDispatcher::new();
        assert_eq!(menu.lookup(CONFIRM), Some(MenuAction::Rewrite("yes")));
        assert_eq!(menu.lookup(DENY), Some(MenuAction::Rewrite("no")));
    }

    #[test]
    fn test_free_text_is_unmatched() {
        assert!(MenuDispatcher::new().lookup("hello there").is_none());
        assert_eq!(MenuDispatcher::new().lookup(ADD_ADMIN), Some(MenuAction::Enter(FlowId::AddAdmin)));
    }
}
