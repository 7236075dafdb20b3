use std::ffi::c_void;
use std::path::Path;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use retour::RawDetour;
use windows::Win32::Foundation::HMODULE;
use windows::Win32::System::LibraryLoader::{
    GET_MODULE_HANDLE_EX_FLAG_PIN, GetModuleHandleExW, GetProcAddress,
};
use windows::core::{HSTRING, PCSTR, s};

use crate::error::{MirrorError, MirrorResult};

type WaitSyncFn = unsafe extern "C" fn(session: *mut c_void, frame_info: *mut c_void);
type SetPriorityFn = unsafe extern "C" fn(session: *mut c_void, priority: i32);

// Written before the detour is enabled; read from whichever thread the
// runtime syncs on.
static ORIGINAL_WAIT_SYNC: AtomicUsize = AtomicUsize::new(0);
static SET_PRIORITY: AtomicUsize = AtomicUsize::new(0);
static PRIORITY: AtomicI32 = AtomicI32::new(0);

unsafe extern "C" fn hooked_wait_sync(session: *mut c_void, frame_info: *mut c_void) {
    let set_priority = SET_PRIORITY.load(Ordering::Acquire);
    if set_priority != 0 {
        let set_priority: SetPriorityFn = unsafe { std::mem::transmute(set_priority) };
        unsafe { set_priority(session, PRIORITY.load(Ordering::Acquire)) };
    }
    let original = ORIGINAL_WAIT_SYNC.load(Ordering::Acquire);
    if original != 0 {
        let original: WaitSyncFn = unsafe { std::mem::transmute(original) };
        unsafe { original(session, frame_info) };
    }
}

fn export(module: HMODULE, name: PCSTR, display: &str) -> MirrorResult<usize> {
    unsafe { GetProcAddress(module, name) }
        .map(|proc| proc as usize)
        .ok_or_else(|| MirrorError::HookUnavailable(format!("{display} is not exported")))
}

/// Detour `varjo_WaitSync` in the already-loaded runtime library so every
/// frame sync first raises the session to `priority`.
pub(crate) fn install(library_path: &Path, priority: i32) -> MirrorResult<()> {
    let mut module = HMODULE::default();
    unsafe {
        GetModuleHandleExW(
            GET_MODULE_HANDLE_EX_FLAG_PIN,
            &HSTRING::from(library_path),
            &mut module,
        )
    }
    .map_err(|err| {
        MirrorError::HookUnavailable(format!(
            "{} is not loaded: {err}",
            library_path.display()
        ))
    })?;

    let wait_sync = export(module, s!("varjo_WaitSync"), "varjo_WaitSync")?;
    let set_priority = export(module, s!("varjo_SessionSetPriority"), "varjo_SessionSetPriority")?;

    let detour = unsafe { RawDetour::new(wait_sync as *const (), hooked_wait_sync as *const ()) }
        .map_err(|err| MirrorError::HookUnavailable(format!("varjo_WaitSync detour: {err}")))?;

    PRIORITY.store(priority, Ordering::Release);
    SET_PRIORITY.store(set_priority, Ordering::Release);
    ORIGINAL_WAIT_SYNC.store(detour.trampoline() as *const () as usize, Ordering::Release);

    unsafe { detour.enable() }
        .map_err(|err| MirrorError::HookUnavailable(format!("enabling detour: {err}")))?;

    // The library is pinned, so the patched code stays valid for the life of
    // the process.
    std::mem::forget(detour);
    Ok(())
}
