// 该文件是 Banmian （版面） 项目的一部分。
// src/ffi.rs - C ABI 导出
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Banmian 项目贡献者

//! 宿主程序（移动端应用等）通过这些函数调用检测服务。
//!
//! 所有返回的字符串都由本库分配，必须交还给 `freeString` 释放；`getVersion` 返回静态字符串，
//! 不需要也不能释放。

#![allow(non_snake_case)]

use std::{
  ffi::{CStr, CString, c_char, c_float, c_int, c_uchar},
  path::PathBuf,
  sync::LazyLock,
};

use tracing::error;

use crate::{
  input::InputError,
  output::json,
  service::{LayoutService, ServiceError},
};

static SERVICE: LazyLock<LayoutService> = LazyLock::new(LayoutService::default);

static VERSION_C: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

fn into_c_string(text: String) -> *mut c_char {
  CString::new(text).unwrap_or_default().into_raw()
}

/// # Safety
///
/// `ptr` 必须为空指针或指向以 NUL 结尾的字符串。
unsafe fn path_from_ptr(ptr: *const c_char) -> Option<PathBuf> {
  if ptr.is_null() {
    return None;
  }
  let text = unsafe { CStr::from_ptr(ptr) };
  Some(path_from_c_str(text))
}

#[cfg(unix)]
fn path_from_c_str(text: &CStr) -> PathBuf {
  use std::{ffi::OsStr, os::unix::ffi::OsStrExt};
  // 路径按原始字节传递，不要求 UTF-8
  PathBuf::from(OsStr::from_bytes(text.to_bytes()))
}

#[cfg(not(unix))]
fn path_from_c_str(text: &CStr) -> PathBuf {
  PathBuf::from(text.to_string_lossy().into_owned())
}

/// 设置模型路径并加载模型
///
/// # Safety
///
/// `model_path` 必须为空指针或指向以 NUL 结尾的字符串。
#[unsafe(no_mangle)]
pub unsafe extern "C" fn initModel(model_path: *const c_char) {
  let Some(path) = (unsafe { path_from_ptr(model_path) }) else {
    error!("模型路径为空指针");
    return;
  };
  // 失败已记录，下一次检测会重试
  let _ = SERVICE.init_model(path);
}

/// 检测图像文件，返回 JSON 字符串
///
/// # Safety
///
/// `img_path` 必须为空指针或指向以 NUL 结尾的字符串。返回值需交给 `freeString` 释放。
#[unsafe(no_mangle)]
pub unsafe extern "C" fn detectLayout(img_path: *const c_char, conf_threshold: c_float) -> *mut c_char {
  let text = match unsafe { path_from_ptr(img_path) } {
    Some(path) => SERVICE.detect_path_json(path, conf_threshold),
    None => ServiceError::from(InputError::IoError(std::io::Error::from(
      std::io::ErrorKind::InvalidInput,
    )))
    .to_json(),
  };
  into_c_string(text)
}

/// 检测交错排列的像素缓冲（1 灰度 / 3 BGR / 4 RGBA），返回 JSON 字符串
///
/// # Safety
///
/// `image_data` 必须为空指针或指向至少 `width * height * channels` 个可读字节。
/// 返回值需交给 `freeString` 释放。
#[unsafe(no_mangle)]
pub unsafe extern "C" fn detectLayoutFromBytes(
  image_data: *const c_uchar,
  width: c_int,
  height: c_int,
  channels: c_int,
  conf_threshold: c_float,
) -> *mut c_char {
  if image_data.is_null() {
    return into_c_string(json::error_to_json("INVALID_INPUT", "像素数据为空指针"));
  }
  let Some(len) = crate::input::RawPixels::expected_len(width.into(), height.into(), channels.into())
  else {
    return into_c_string(
      ServiceError::from(InputError::InvalidDimensions {
        width: width.into(),
        height: height.into(),
      })
      .to_json(),
    );
  };

  let data = unsafe { std::slice::from_raw_parts(image_data, len) };
  into_c_string(SERVICE.detect_bytes_json(
    data,
    width.into(),
    height.into(),
    channels.into(),
    conf_threshold,
  ))
}

/// 释放本库返回的字符串
///
/// # Safety
///
/// `ptr` 必须为空指针或由 `detectLayout`/`detectLayoutFromBytes` 返回且尚未释放。
#[unsafe(no_mangle)]
pub unsafe extern "C" fn freeString(ptr: *mut c_char) {
  if ptr.is_null() {
    return;
  }
  drop(unsafe { CString::from_raw(ptr) });
}

#[unsafe(no_mangle)]
pub extern "C" fn getVersion() -> *const c_char {
  VERSION_C.as_ptr().cast()
}
