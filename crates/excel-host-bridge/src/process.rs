//! Native process control: window handle -> process id, and termination.

#![cfg(windows)]

use std::ffi::c_void;

use windows::Win32::{
    Foundation::{CloseHandle, HWND},
    System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE},
    UI::WindowsAndMessaging::{GetWindowThreadProcessId, IsWindow},
};

/// The process owning `hwnd`, or `None` once the window is gone.
pub fn process_id_for_window(hwnd: i64) -> Option<u32> {
    unsafe {
        let hwnd = HWND(hwnd as isize as *mut c_void);
        if !IsWindow(Some(hwnd)).as_bool() {
            return None;
        }
        let mut pid = 0u32;
        let thread = GetWindowThreadProcessId(hwnd, Some(&mut pid));
        if thread == 0 || pid == 0 {
            None
        } else {
            Some(pid)
        }
    }
}

pub fn terminate_process(pid: u32) -> Result<(), String> {
    unsafe {
        let handle = OpenProcess(PROCESS_TERMINATE, false, pid)
            .map_err(|e| format!("OpenProcess({pid}) failed: {e}"))?;
        let result = TerminateProcess(handle, 1)
            .map_err(|e| format!("TerminateProcess({pid}) failed: {e}"));
        let _ = CloseHandle(handle);
        result
    }
}
