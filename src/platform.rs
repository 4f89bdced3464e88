//! OS-backed actuators for the gesture dispatcher.

use crate::gestures::dispatch::{ClipboardBackend, InputBackend, Key, MouseButton};
use anyhow::Context;

#[cfg(windows)]
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_KEYUP, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_RIGHTDOWN,
    MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_WHEEL, MOUSE_EVENT_FLAGS, MOUSEINPUT, VIRTUAL_KEY,
    VK_CONTROL, VK_MENU, VK_SHIFT,
};

/// Marks input injected by this process. Fits `dwExtraInfo` on 32-bit targets.
#[cfg_attr(not(windows), allow(dead_code))]
const PINCH_INJECT_TAG: u32 = 0x504E_4348; // "PNCH"

#[cfg(windows)]
const WHEEL_STEP: i32 = 120;

/// Drives the real cursor, buttons, wheel and keyboard.
#[derive(Debug, Default)]
pub struct SystemInput;

#[cfg(windows)]
impl InputBackend for SystemInput {
    fn screen_size(&self) -> Option<(i32, i32)> {
        use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};
        let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        if width > 0 && height > 0 {
            Some((width, height))
        } else {
            None
        }
    }

    fn move_cursor(&self, x: i32, y: i32) -> anyhow::Result<()> {
        use windows::Win32::UI::WindowsAndMessaging::SetCursorPos;
        unsafe { SetCursorPos(x, y) }.context("set cursor position")?;
        Ok(())
    }

    fn mouse_down(&self, button: MouseButton) -> anyhow::Result<()> {
        let flags = match button {
            MouseButton::Left => MOUSEEVENTF_LEFTDOWN,
            MouseButton::Right => MOUSEEVENTF_RIGHTDOWN,
        };
        send_mouse(flags, 0).context("press mouse button")
    }

    fn mouse_up(&self, button: MouseButton) -> anyhow::Result<()> {
        let flags = match button {
            MouseButton::Left => MOUSEEVENTF_LEFTUP,
            MouseButton::Right => MOUSEEVENTF_RIGHTUP,
        };
        send_mouse(flags, 0).context("release mouse button")
    }

    fn scroll(&self, units: i32) -> anyhow::Result<()> {
        send_mouse(MOUSEEVENTF_WHEEL, units.saturating_mul(WHEEL_STEP)).context("scroll wheel")
    }

    fn hotkey(&self, keys: &[Key]) -> anyhow::Result<()> {
        let vks: Vec<VIRTUAL_KEY> = keys
            .iter()
            .map(|key| virtual_key(*key))
            .collect::<anyhow::Result<Vec<_>>>()?;

        for &vk in &vks {
            send_vk(vk, KEYBD_EVENT_FLAGS(0))?;
        }
        for &vk in vks.iter().rev() {
            send_vk(vk, KEYEVENTF_KEYUP)?;
        }
        Ok(())
    }
}

#[cfg(windows)]
fn virtual_key(key: Key) -> anyhow::Result<VIRTUAL_KEY> {
    match key {
        Key::Control => Ok(VK_CONTROL),
        Key::Shift => Ok(VK_SHIFT),
        Key::Alt => Ok(VK_MENU),
        Key::Char(ch) if ch.is_ascii_alphanumeric() => {
            Ok(VIRTUAL_KEY(ch.to_ascii_uppercase() as u16))
        }
        Key::Char(ch) => anyhow::bail!("no virtual key for {ch:?}"),
    }
}

#[cfg(windows)]
fn send_mouse(flags: MOUSE_EVENT_FLAGS, data: i32) -> anyhow::Result<()> {
    let input = INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx: 0,
                dy: 0,
                mouseData: data as _,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: PINCH_INJECT_TAG as usize,
            },
        },
    };
    let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
    if sent == 0 {
        anyhow::bail!("SendInput returned 0");
    }
    Ok(())
}

#[cfg(windows)]
fn send_vk(vk: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS) -> anyhow::Result<()> {
    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: PINCH_INJECT_TAG as usize,
            },
        },
    };
    let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
    if sent == 0 {
        anyhow::bail!("SendInput returned 0");
    }
    Ok(())
}

#[cfg(not(windows))]
impl InputBackend for SystemInput {
    fn screen_size(&self) -> Option<(i32, i32)> {
        None
    }

    fn move_cursor(&self, _x: i32, _y: i32) -> anyhow::Result<()> {
        anyhow::bail!("cursor control is only supported on Windows")
    }

    fn mouse_down(&self, _button: MouseButton) -> anyhow::Result<()> {
        anyhow::bail!("mouse buttons are only supported on Windows")
    }

    fn mouse_up(&self, _button: MouseButton) -> anyhow::Result<()> {
        anyhow::bail!("mouse buttons are only supported on Windows")
    }

    fn scroll(&self, _units: i32) -> anyhow::Result<()> {
        anyhow::bail!("mouse wheel is only supported on Windows")
    }

    fn hotkey(&self, _keys: &[Key]) -> anyhow::Result<()> {
        anyhow::bail!("keyboard shortcuts are only supported on Windows")
    }
}

/// System clipboard through `arboard`. A fresh handle is opened per call
/// since some platforms tie the handle to the calling thread.
#[derive(Debug, Default)]
pub struct ArboardClipboard;

impl ClipboardBackend for ArboardClipboard {
    fn copy(&self, text: &str) -> anyhow::Result<()> {
        let mut clipboard = arboard::Clipboard::new().context("open clipboard")?;
        clipboard
            .set_text(text.to_string())
            .context("write clipboard text")?;
        Ok(())
    }

    fn paste(&self) -> anyhow::Result<String> {
        let mut clipboard = arboard::Clipboard::new().context("open clipboard")?;
        match clipboard.get_text() {
            Ok(text) => Ok(text),
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(err) => Err(err).context("read clipboard text"),
        }
    }
}
