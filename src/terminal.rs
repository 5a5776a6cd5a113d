//! Console capability detection: whether to use the fancy (overprinting,
//! colored) reporter or fall back to the dumb line-oriented one.

#[cfg(unix)]
mod unix {
    pub fn use_fancy() -> bool {
        unsafe { libc::isatty(/* stdout */ 1) == 1 }
    }

    pub fn get_cols() -> Option<usize> {
        unsafe {
            let mut winsize = std::mem::MaybeUninit::<libc::winsize>::uninit();
            if libc::ioctl(0, libc::TIOCGWINSZ, &mut winsize) < 0 {
                return None;
            }
            let winsize = winsize.assume_init();
            Some(winsize.ws_col as usize)
        }
    }
}

#[cfg(unix)]
pub use unix::*;

#[cfg(windows)]
mod windows {
    use windows_sys::Win32::System::Console::{
        GetConsoleMode, GetConsoleScreenBufferInfo, GetStdHandle, CONSOLE_SCREEN_BUFFER_INFO,
        STD_OUTPUT_HANDLE,
    };

    pub fn use_fancy() -> bool {
        unsafe {
            let handle = GetStdHandle(STD_OUTPUT_HANDLE);
            let mut mode = 0;
            // GetConsoleMode itself fails when not attached to a console.
            GetConsoleMode(handle, &mut mode) != 0
        }
    }

    pub fn get_cols() -> Option<usize> {
        unsafe {
            let handle = GetStdHandle(STD_OUTPUT_HANDLE);
            let mut csbi: CONSOLE_SCREEN_BUFFER_INFO = std::mem::zeroed();
            if GetConsoleScreenBufferInfo(handle, &mut csbi) == 0 {
                return None;
            }
            Some(csbi.dwSize.X as usize)
        }
    }
}

#[cfg(windows)]
pub use windows::*;

#[cfg(target_arch = "wasm32")]
mod wasm {
    pub fn use_fancy() -> bool {
        false
    }

    pub fn get_cols() -> Option<usize> {
        None
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
