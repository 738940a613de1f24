//! OS queries behind the pet's platform-neutral traits.
//!
//! Win32 is the real backend. Elsewhere every query is neutral: no windows,
//! no idle time, no clicks, so the cat just walks along the floor.

#[cfg(windows)]
pub mod win32;

use crate::pet::idle::IdleSource;
use crate::surface::{RawWindow, WindowSource};

/// Top-level windows of the current desktop.
#[derive(Debug, Default)]
pub struct DesktopWindows {
    #[cfg(windows)]
    own_hwnd: Option<windows::Win32::Foundation::HWND>,
}

impl DesktopWindows {
    /// Enumerator that skips `own` (the overlay) by handle.
    pub fn new(own: Option<&winit::window::Window>) -> Self {
        #[cfg(windows)]
        {
            Self {
                own_hwnd: own.and_then(win32::get_hwnd),
            }
        }
        #[cfg(not(windows))]
        {
            let _ = own;
            Self {}
        }
    }
}

impl WindowSource for DesktopWindows {
    fn visible_windows(&mut self) -> Vec<RawWindow> {
        #[cfg(windows)]
        {
            win32::enumerate_windows(self.own_hwnd)
        }
        #[cfg(not(windows))]
        {
            Vec::new()
        }
    }

    fn screen_size(&self) -> Option<(f32, f32)> {
        #[cfg(windows)]
        {
            win32::screen_size()
        }
        #[cfg(not(windows))]
        {
            None
        }
    }
}

/// System-wide input idle time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemIdle;

impl IdleSource for SystemIdle {
    // Win32 reports one last-input time for both devices.
    fn seconds_since_pointer(&self) -> f64 {
        #[cfg(windows)]
        {
            win32::idle_seconds()
        }
        #[cfg(not(windows))]
        {
            0.0
        }
    }

    fn seconds_since_key(&self) -> f64 {
        self.seconds_since_pointer()
    }

    fn idle_seconds(&self) -> f64 {
        self.seconds_since_pointer()
    }
}

/// Global cursor position, window pixels, y down.
pub fn cursor_pos() -> (f32, f32) {
    #[cfg(windows)]
    {
        win32::cursor_pos()
    }
    #[cfg(not(windows))]
    {
        (0.0, 0.0)
    }
}

pub fn right_button_down() -> bool {
    #[cfg(windows)]
    {
        win32::right_button_down()
    }
    #[cfg(not(windows))]
    {
        false
    }
}

/// Prepare `window` as a click-through overlay.
pub fn setup_overlay(window: &winit::window::Window) {
    #[cfg(windows)]
    win32::setup_overlay(window);
    #[cfg(not(windows))]
    let _ = window;
}
