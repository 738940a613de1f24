//! Notification-area icon with the Toggle / Quit menu, plus the sprite's
//! interaction popup, on top of Shell_NotifyIconW.

#[cfg(windows)]
use std::cell::Cell;

#[cfg(windows)]
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
#[cfg(windows)]
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NOTIFYICONDATAW,
};
#[cfg(windows)]
use windows::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CreatePopupMenu, CreateWindowExW, DefWindowProcW, DestroyMenu, DestroyWindow,
    GetCursorPos, LoadIconW, RegisterClassW, SetForegroundWindow, TrackPopupMenu,
    CS_HREDRAW, CS_VREDRAW, HMENU, IDI_APPLICATION, MF_SEPARATOR, MF_STRING, TPM_BOTTOMALIGN,
    TPM_LEFTALIGN, TPM_NONOTIFY, TPM_RETURNCMD, TPM_TOPALIGN, TRACK_POPUP_MENU_FLAGS, WM_COMMAND,
    WM_DESTROY, WM_RBUTTONUP, WM_USER, WNDCLASSW, WS_EX_TOOLWINDOW,
};

use crate::pet::mode::InteractionKind;

/// Callback message the shell sends for icon clicks.
#[cfg(windows)]
const WM_TRAYICON: u32 = WM_USER + 1;

const ID_QUIT: u16 = 1000;
const ID_TOGGLE: u16 = 1001;
const ID_INTERACT_BASE: u16 = 2000;

/// What the user picked from the tray menu since the last poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    None,
    Toggle,
    Quit,
}

fn command_for(id: u16) -> TrayCommand {
    match id {
        ID_QUIT => TrayCommand::Quit,
        ID_TOGGLE => TrayCommand::Toggle,
        _ => TrayCommand::None,
    }
}

fn interaction_id(kind: InteractionKind) -> u16 {
    let offset = InteractionKind::ALL
        .iter()
        .position(|&k| k == kind)
        .unwrap_or_default();
    ID_INTERACT_BASE + offset as u16
}

fn interaction_for(id: u16) -> Option<InteractionKind> {
    InteractionKind::ALL
        .into_iter()
        .find(|&kind| interaction_id(kind) == id)
}

#[derive(Debug, thiserror::Error)]
pub enum TrayError {
    #[cfg(windows)]
    #[error("failed to create tray window: {0}")]
    Window(#[from] windows::core::Error),
}

pub struct TrayIcon {
    #[cfg(windows)]
    hwnd: HWND,
    #[cfg(windows)]
    nid: NOTIFYICONDATAW,
}

#[cfg(windows)]
thread_local! {
    /// Latest menu choice, recorded by the window procedure and taken by `poll`.
    static PENDING: Cell<TrayCommand> = const { Cell::new(TrayCommand::None) };
}

#[cfg(windows)]
const CLASS_NAME: windows::core::PCWSTR = windows::core::w!("PerchCatTrayClass");
#[cfg(windows)]
const TOOLTIP: &str = "Perch Cat";

/// Hidden window that receives the icon's callback messages.
#[cfg(windows)]
unsafe fn create_message_window() -> windows::core::Result<HWND> {
    use windows::Win32::Foundation::HINSTANCE;

    let wc = WNDCLASSW {
        style: CS_HREDRAW | CS_VREDRAW,
        lpfnWndProc: Some(tray_wnd_proc),
        lpszClassName: CLASS_NAME,
        ..Default::default()
    };
    RegisterClassW(&wc);

    CreateWindowExW(
        WS_EX_TOOLWINDOW,
        CLASS_NAME,
        windows::core::PCWSTR::null(),
        Default::default(),
        0,
        0,
        0,
        0,
        HWND::default(),
        HMENU::default(),
        HINSTANCE::default(),
        None,
    )
}

#[cfg(windows)]
fn notify_data(hwnd: HWND) -> NOTIFYICONDATAW {
    let mut nid = NOTIFYICONDATAW {
        cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: hwnd,
        uID: 1,
        uFlags: NIF_ICON | NIF_MESSAGE | NIF_TIP,
        uCallbackMessage: WM_TRAYICON,
        hIcon: unsafe { LoadIconW(None, IDI_APPLICATION) }.unwrap_or_default(),
        ..Default::default()
    };
    // Leave room for the terminating nul.
    let room = nid.szTip.len() - 1;
    for (slot, ch) in nid.szTip[..room].iter_mut().zip(TOOLTIP.encode_utf16()) {
        *slot = ch;
    }
    nid
}

#[cfg(windows)]
impl TrayIcon {
    pub fn new() -> Result<Self, TrayError> {
        let hwnd = unsafe { create_message_window() }?;
        let nid = notify_data(hwnd);
        unsafe {
            let _ = Shell_NotifyIconW(NIM_ADD, &nid);
        }
        log::info!("System tray icon created");

        Ok(Self { hwnd, nid })
    }

    /// Pump the message window and return the latest menu command.
    pub fn poll(&mut self) -> TrayCommand {
        use windows::Win32::UI::WindowsAndMessaging::{
            DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE,
        };

        let mut msg = MSG::default();
        while unsafe { PeekMessageW(&mut msg, self.hwnd, 0, 0, PM_REMOVE) }.as_bool() {
            unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        PENDING.replace(TrayCommand::None)
    }

    /// Show the Pet / Scratch / Feed menu at the cursor and wait for a choice.
    pub fn popup_interaction(&self) -> Option<InteractionKind> {
        let items: Vec<(u16, &str)> = InteractionKind::ALL
            .iter()
            .map(|&kind| (interaction_id(kind), kind.label()))
            .collect();
        let flags = TPM_LEFTALIGN | TPM_TOPALIGN | TPM_RETURNCMD | TPM_NONOTIFY;
        let chosen = unsafe { track_menu(self.hwnd, &items, flags) }?;
        interaction_for(chosen)
    }

    /// Take the icon out of the notification area. Safe to call twice.
    pub fn remove(&mut self) {
        if self.hwnd.is_invalid() {
            return;
        }
        unsafe {
            let _ = Shell_NotifyIconW(NIM_DELETE, &self.nid);
            let _ = DestroyWindow(self.hwnd);
        }
        self.hwnd = HWND::default();
    }
}

#[cfg(windows)]
impl Drop for TrayIcon {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(windows)]
unsafe extern "system" fn tray_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_TRAYICON if (lparam.0 & 0xFFFF) as u32 == WM_RBUTTONUP => {
            let items = [(ID_TOGGLE, "Toggle Cat"), (0, ""), (ID_QUIT, "Quit")];
            let _ = track_menu(hwnd, &items, TPM_LEFTALIGN | TPM_BOTTOMALIGN);
            LRESULT(0)
        }
        // The menu's choice may be dispatched here by the window loop's own
        // pump before `poll` runs, so it is recorded rather than re-posted.
        WM_COMMAND => {
            let command = command_for((wparam.0 & 0xFFFF) as u16);
            if command != TrayCommand::None {
                PENDING.set(command);
            }
            LRESULT(0)
        }
        WM_DESTROY => LRESULT(0),
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

/// Show a popup menu at the cursor. Items with id 0 are separators.
/// With `TPM_RETURNCMD` the chosen id is returned; otherwise the choice
/// arrives as `WM_COMMAND`.
#[cfg(windows)]
unsafe fn track_menu(hwnd: HWND, items: &[(u16, &str)], flags: TRACK_POPUP_MENU_FLAGS) -> Option<u16> {
    let hmenu = CreatePopupMenu().ok()?;

    for &(id, label) in items {
        if id == 0 {
            let _ = AppendMenuW(hmenu, MF_SEPARATOR, 0, windows::core::PCWSTR::null());
            continue;
        }
        let wide: Vec<u16> = label.encode_utf16().chain(std::iter::once(0)).collect();
        let _ = AppendMenuW(
            hmenu,
            MF_STRING,
            id as usize,
            windows::core::PCWSTR(wide.as_ptr()),
        );
    }

    let mut pt = windows::Win32::Foundation::POINT::default();
    let _ = GetCursorPos(&mut pt);

    // Otherwise the menu stays open after a click elsewhere.
    let _ = SetForegroundWindow(hwnd);

    let result = TrackPopupMenu(hmenu, flags, pt.x, pt.y, 0, hwnd, None);
    let _ = DestroyMenu(hmenu);

    u16::try_from(result.0).ok().filter(|&id| id != 0)
}

#[cfg(not(windows))]
impl TrayIcon {
    pub fn new() -> Result<Self, TrayError> {
        Ok(Self {})
    }

    pub fn poll(&mut self) -> TrayCommand {
        TrayCommand::None
    }

    pub fn popup_interaction(&self) -> Option<InteractionKind> {
        None
    }

    pub fn remove(&mut self) {}
}
