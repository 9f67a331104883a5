//! Late-bound COM automation through IDispatch.
//!
//! Excel's automation surface is reached the way VBScript reaches it: member
//! names are looked up at runtime and invoked with VARIANT arguments.

#![cfg(windows)]

use std::mem::ManuallyDrop;
use std::ptr;

use windows::{
    core::{Interface, BSTR, GUID, HSTRING, IUnknown, PCWSTR},
    Win32::{
        Foundation::{DISP_E_EXCEPTION, MK_E_UNAVAILABLE, VARIANT_BOOL},
        Globalization::GetSystemDefaultLCID,
        System::{
            Com::{
                CLSIDFromProgID, CoCreateInstance, IDispatch, CLSCTX_LOCAL_SERVER, DISPATCH_FLAGS,
                DISPATCH_METHOD, DISPATCH_PROPERTYGET, DISPATCH_PROPERTYPUT, DISPPARAMS, EXCEPINFO,
            },
            Ole::{GetActiveObject, DISPID_PROPERTYPUT},
            Variant::{
                VARIANT, VT_BOOL, VT_BSTR, VT_DISPATCH, VT_EMPTY, VT_ERROR, VT_I2, VT_I4, VT_I8,
                VT_NULL, VT_R4, VT_R8,
            },
        },
    },
};

// The VARIANT struct wraps inner unions in ManuallyDrop, so fields are set
// with ptr::write.

pub fn variant_empty() -> VARIANT {
    VARIANT::default()
}

pub fn variant_bool(val: bool) -> VARIANT {
    unsafe {
        let mut v = VARIANT::default();
        let inner = &mut *v.Anonymous.Anonymous;
        ptr::write(&mut inner.vt, VT_BOOL);
        ptr::write(
            &mut inner.Anonymous.boolVal,
            VARIANT_BOOL(if val { -1 } else { 0 }),
        );
        v
    }
}

pub fn variant_f64(val: f64) -> VARIANT {
    unsafe {
        let mut v = VARIANT::default();
        let inner = &mut *v.Anonymous.Anonymous;
        ptr::write(&mut inner.vt, VT_R8);
        ptr::write(&mut inner.Anonymous.dblVal, val);
        v
    }
}

pub fn variant_i32(val: i32) -> VARIANT {
    unsafe {
        let mut v = VARIANT::default();
        let inner = &mut *v.Anonymous.Anonymous;
        ptr::write(&mut inner.vt, VT_I4);
        ptr::write(&mut inner.Anonymous.lVal, val);
        v
    }
}

pub fn variant_str(val: &str) -> VARIANT {
    unsafe {
        let bstr = BSTR::from(val);
        let mut v = VARIANT::default();
        let inner = &mut *v.Anonymous.Anonymous;
        ptr::write(&mut inner.vt, VT_BSTR);
        ptr::write(&mut inner.Anonymous.bstrVal, ManuallyDrop::new(bstr));
        v
    }
}

/// Wrap an object so it can be passed as an argument (e.g. `Copy(Destination)`).
pub fn variant_dispatch(obj: &DispatchObject) -> VARIANT {
    unsafe {
        let mut v = VARIANT::default();
        let inner = &mut *v.Anonymous.Anonymous;
        ptr::write(&mut inner.vt, VT_DISPATCH);
        ptr::write(
            &mut inner.Anonymous.pdispVal,
            ManuallyDrop::new(Some(obj.inner.clone())),
        );
        v
    }
}

pub fn variant_vt(v: &VARIANT) -> u16 {
    unsafe { v.Anonymous.Anonymous.vt.0 }
}

pub fn variant_get_bool(v: &VARIANT) -> Option<bool> {
    unsafe {
        if v.Anonymous.Anonymous.vt == VT_BOOL {
            Some(v.Anonymous.Anonymous.Anonymous.boolVal.0 != 0)
        } else {
            None
        }
    }
}

pub fn variant_get_f64(v: &VARIANT) -> Option<f64> {
    unsafe {
        let vt = v.Anonymous.Anonymous.vt;
        let anon = &v.Anonymous.Anonymous.Anonymous;
        if vt == VT_R8 {
            Some(anon.dblVal)
        } else if vt == VT_R4 {
            Some(anon.fltVal as f64)
        } else if vt == VT_I4 {
            Some(anon.lVal as f64)
        } else if vt == VT_I2 {
            Some(anon.iVal as f64)
        } else {
            None
        }
    }
}

/// Integer properties such as `Row`, `Count` and `Hwnd` come back as I4 on
/// 32-bit builds and I8 on 64-bit ones.
pub fn variant_get_i64(v: &VARIANT) -> Option<i64> {
    unsafe {
        let vt = v.Anonymous.Anonymous.vt;
        let anon = &v.Anonymous.Anonymous.Anonymous;
        if vt == VT_I8 {
            Some(anon.llVal)
        } else if vt == VT_I4 {
            Some(anon.lVal as i64)
        } else if vt == VT_I2 {
            Some(anon.iVal as i64)
        } else if vt == VT_R8 {
            Some(anon.dblVal as i64)
        } else {
            None
        }
    }
}

pub fn variant_get_string(v: &VARIANT) -> Option<String> {
    unsafe {
        if v.Anonymous.Anonymous.vt == VT_BSTR {
            let bstr = &v.Anonymous.Anonymous.Anonymous.bstrVal;
            Some(bstr.to_string())
        } else {
            None
        }
    }
}

pub fn variant_get_dispatch(v: &VARIANT) -> Option<IDispatch> {
    unsafe {
        if v.Anonymous.Anonymous.vt == VT_DISPATCH {
            let opt_disp: &Option<IDispatch> = &v.Anonymous.Anonymous.Anonymous.pdispVal;
            opt_disp.clone()
        } else {
            None
        }
    }
}

pub fn variant_is_empty(v: &VARIANT) -> bool {
    unsafe {
        let vt = v.Anonymous.Anonymous.vt;
        vt == VT_EMPTY || vt == VT_NULL
    }
}

pub fn variant_is_error(v: &VARIANT) -> bool {
    unsafe { v.Anonymous.Anonymous.vt == VT_ERROR }
}

/// An IDispatch COM object with name-based member access.
#[derive(Clone)]
pub struct DispatchObject {
    inner: IDispatch,
}

impl DispatchObject {
    /// Start a new server process for a ProgID (e.g. "Excel.Application").
    pub fn create_from_progid(progid: &str) -> Result<Self, String> {
        unsafe {
            let clsid = clsid_for(progid)?;
            let disp: IDispatch = CoCreateInstance(&clsid, None, CLSCTX_LOCAL_SERVER)
                .map_err(|e| format!("CoCreateInstance failed for '{progid}': {e}"))?;
            Ok(Self { inner: disp })
        }
    }

    /// Attach to the instance registered in the running object table.
    /// `Ok(None)` means no instance is running.
    pub fn attach_from_progid(progid: &str) -> Result<Option<Self>, String> {
        unsafe {
            let clsid = clsid_for(progid)?;
            let mut unknown: Option<IUnknown> = None;
            match GetActiveObject(&clsid, None, &mut unknown) {
                Ok(()) => {}
                Err(e) if e.code() == MK_E_UNAVAILABLE => return Ok(None),
                Err(e) => return Err(format!("GetActiveObject failed for '{progid}': {e}")),
            }
            let Some(unknown) = unknown else {
                return Ok(None);
            };
            let disp: IDispatch = unknown
                .cast()
                .map_err(|e| format!("'{progid}' does not expose IDispatch: {e}"))?;
            Ok(Some(Self { inner: disp }))
        }
    }

    pub fn from_idispatch(disp: IDispatch) -> Self {
        Self { inner: disp }
    }

    fn get_dispid(&self, name: &str) -> Result<i32, String> {
        unsafe {
            let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
            let names = [PCWSTR(wide.as_ptr())];
            let mut dispid = 0i32;
            self.inner
                .GetIDsOfNames(
                    &GUID::zeroed(),
                    names.as_ptr(),
                    1,
                    GetSystemDefaultLCID(),
                    &mut dispid,
                )
                .map_err(|e| format!("GetIDsOfNames('{name}') failed: {e}"))?;
            Ok(dispid)
        }
    }

    /// Invoke a member with positional arguments in natural order.
    fn invoke(&self, name: &str, flags: DISPATCH_FLAGS, args: &[VARIANT]) -> Result<VARIANT, String> {
        let dispid = self.get_dispid(name)?;
        unsafe {
            // DISPPARAMS wants arguments last-to-first.
            let mut reversed: Vec<VARIANT> = args.iter().rev().cloned().collect();
            let params = DISPPARAMS {
                rgvarg: if reversed.is_empty() {
                    ptr::null_mut()
                } else {
                    reversed.as_mut_ptr()
                },
                rgdispidNamedArgs: ptr::null_mut(),
                cArgs: reversed.len() as u32,
                cNamedArgs: 0,
            };
            let mut result = VARIANT::default();
            let mut except = EXCEPINFO::default();
            self.inner
                .Invoke(
                    dispid,
                    &GUID::zeroed(),
                    GetSystemDefaultLCID(),
                    flags,
                    &params,
                    Some(&mut result),
                    Some(&mut except),
                    None,
                )
                .map_err(|e| format_invoke_error(e, &except, name))?;
            Ok(result)
        }
    }

    /// `obj.PropertyName`
    pub fn get_property(&self, name: &str) -> Result<VARIANT, String> {
        self.invoke(name, DISPATCH_PROPERTYGET, &[])
    }

    /// `obj.PropertyName = value`
    pub fn set_property(&self, name: &str, value: VARIANT) -> Result<(), String> {
        let dispid = self.get_dispid(name)?;
        unsafe {
            let mut args = [value];
            let mut named_args = [DISPID_PROPERTYPUT];
            let params = DISPPARAMS {
                rgvarg: args.as_mut_ptr(),
                rgdispidNamedArgs: named_args.as_mut_ptr(),
                cArgs: 1,
                cNamedArgs: 1,
            };
            let mut except = EXCEPINFO::default();
            self.inner
                .Invoke(
                    dispid,
                    &GUID::zeroed(),
                    GetSystemDefaultLCID(),
                    DISPATCH_PROPERTYPUT,
                    &params,
                    None,
                    Some(&mut except),
                    None,
                )
                .map_err(|e| format_invoke_error(e, &except, name))?;
            Ok(())
        }
    }

    /// `obj.Method(args...)`
    pub fn invoke_method(&self, name: &str, args: &[VARIANT]) -> Result<VARIANT, String> {
        self.invoke(name, DISPATCH_METHOD, args)
    }

    /// A property that returns an object.
    pub fn get_child(&self, name: &str) -> Result<DispatchObject, String> {
        let variant = self.get_property(name)?;
        extract_dispatch(&variant, name)
    }

    /// A property that may hold `Nothing`.
    pub fn get_optional_child(&self, name: &str) -> Result<Option<DispatchObject>, String> {
        let variant = self.get_property(name)?;
        if variant_is_empty(&variant) {
            return Ok(None);
        }
        if variant_vt(&variant) == VT_DISPATCH.0 {
            return Ok(variant_get_dispatch(&variant).map(DispatchObject::from_idispatch));
        }
        extract_dispatch(&variant, name).map(Some)
    }

    /// A method that returns an object.
    pub fn invoke_child(&self, name: &str, args: &[VARIANT]) -> Result<DispatchObject, String> {
        let variant = self.invoke_method(name, args)?;
        extract_dispatch(&variant, name)
    }

    /// A parameterized property returning an object: `Worksheets(1)`,
    /// `Range("A1")`, `Cells(row, col)`, `End(xlUp)`.
    pub fn get_indexed(&self, name: &str, args: &[VARIANT]) -> Result<DispatchObject, String> {
        let variant = self.invoke(name, DISPATCH_PROPERTYGET, args)?;
        extract_dispatch(&variant, name)
    }

    /// An integer-valued property such as `Row` or `Count`.
    pub fn get_i64(&self, name: &str) -> Result<i64, String> {
        let variant = self.get_property(name)?;
        variant_get_i64(&variant)
            .ok_or_else(|| format!("'{name}' returned VT={}, expected an integer", variant_vt(&variant)))
    }

    pub fn get_f64(&self, name: &str) -> Result<f64, String> {
        let variant = self.get_property(name)?;
        variant_get_f64(&variant)
            .ok_or_else(|| format!("'{name}' returned VT={}, expected a number", variant_vt(&variant)))
    }

    pub fn get_string(&self, name: &str) -> Result<String, String> {
        let variant = self.get_property(name)?;
        variant_get_string(&variant)
            .ok_or_else(|| format!("'{name}' returned VT={}, expected a string", variant_vt(&variant)))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, String> {
        let variant = self.get_property(name)?;
        variant_get_bool(&variant)
            .ok_or_else(|| format!("'{name}' returned VT={}, expected a bool", variant_vt(&variant)))
    }
}

unsafe fn clsid_for(progid: &str) -> Result<GUID, String> {
    let hstr = HSTRING::from(progid);
    CLSIDFromProgID(&hstr).map_err(|e| format!("CLSIDFromProgID('{progid}') failed: {e}"))
}

fn extract_dispatch(variant: &VARIANT, context: &str) -> Result<DispatchObject, String> {
    if let Some(disp) = variant_get_dispatch(variant) {
        Ok(DispatchObject::from_idispatch(disp))
    } else if variant_is_empty(variant) {
        Err(format!("'{context}' returned empty/null"))
    } else {
        let vt = variant_vt(variant);
        Err(format!(
            "'{context}' returned non-object VARIANT (VT={vt}), expected VT_DISPATCH"
        ))
    }
}

/// Include EXCEPINFO details when the server raised an exception.
fn format_invoke_error(err: windows::core::Error, except: &EXCEPINFO, member_name: &str) -> String {
    if err.code() == DISP_E_EXCEPTION {
        let desc = if !except.bstrDescription.is_empty() {
            except.bstrDescription.to_string()
        } else {
            String::from("(no description)")
        };
        let source = if !except.bstrSource.is_empty() {
            except.bstrSource.to_string()
        } else {
            String::from("(no source)")
        };
        format!("COM exception in '{member_name}': {desc} (source: {source})")
    } else {
        format!("Invoke('{member_name}') failed: {err}")
    }
}
