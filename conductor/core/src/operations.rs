//! Built-in Host Operations
//!
//! The operations every surface can call through `remote_invoke`. Arguments
//! arrive as a positional JSON array; missing trailing arguments and `null`
//! both mean "not given".
//!
//! | Wire name                   | Arguments                 | Result          |
//! |-----------------------------|---------------------------|-----------------|
//! | `createAppWindow`           | `overrides?`, `name?`     | window name     |
//! | `createWindow`              | `options?`                | window name     |
//! | `closeWindow`               | `name`                    | `bool`          |
//! | `showAndFocusWindow`        | `name?`                   | `bool`          |
//! | `openOrCreateWindow`        |                           | created name    |
//! | `createTrayIcon`            | `name?`                   | `null`          |
//! | `removeTrayIcon`            | `name`                    | `bool`          |
//! | `setTrayAlert`              | `name`, `alert`           | `bool`          |
//! | `tryQuitOnAllWindowsClosed` |                           | `bool`          |
//! | `currentFocusWindow`        |                           | name or `null`  |
//! | `windowNames`               |                           | names           |
//! | `appConfig`                 |                           | configuration   |
//! | `rootPath`                  |                           | path            |
//! | `quit`                      |                           | never replies   |

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::broker::{BuiltinOperation, Invocation, OperationError};
use crate::conductor::Conductor;
use crate::platform::{Platform, WindowOptions, WindowOverrides};
use crate::quit::ExitReason;

fn optional_arg<T: DeserializeOwned>(
    op: BuiltinOperation,
    args: &[Value],
    index: usize,
) -> Result<Option<T>, OperationError> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => T::deserialize(value)
            .map(Some)
            .map_err(|e| OperationError::invalid_arguments(op.wire_name(), e)),
    }
}

fn required_arg<T: DeserializeOwned>(
    op: BuiltinOperation,
    args: &[Value],
    index: usize,
) -> Result<T, OperationError> {
    optional_arg(op, args, index)?.ok_or_else(|| {
        OperationError::invalid_arguments(op.wire_name(), format!("missing argument {index}"))
    })
}

impl<P: Platform> Conductor<P> {
    /// Run a built-in operation
    pub(crate) fn run_builtin(
        &mut self,
        op: BuiltinOperation,
        args: &[Value],
    ) -> Result<Invocation, OperationError> {
        let value = match op {
            BuiltinOperation::CreateAppWindow => {
                let overrides: Option<WindowOverrides> = optional_arg(op, args, 0)?;
                let name: Option<String> = optional_arg(op, args, 1)?;
                let name = self.create_app_window(overrides.unwrap_or_default(), name.as_deref())?;
                json!(name)
            }
            BuiltinOperation::CreateWindow => {
                let options: Option<WindowOptions> = optional_arg(op, args, 0)?;
                json!(self.create_window(options.unwrap_or_default())?)
            }
            BuiltinOperation::CloseWindow => {
                let name: String = required_arg(op, args, 0)?;
                json!(self.close_window(&name))
            }
            BuiltinOperation::ShowAndFocusWindow => {
                let name: Option<String> = optional_arg(op, args, 0)?;
                json!(self.show_and_focus_window(name.as_deref()))
            }
            BuiltinOperation::OpenOrCreateWindow => json!(self.open_or_create_window()?),
            BuiltinOperation::CreateTrayIcon => {
                let name: Option<String> = optional_arg(op, args, 0)?;
                self.create_tray_icon(name.as_deref())?;
                Value::Null
            }
            BuiltinOperation::RemoveTrayIcon => {
                let name: String = required_arg(op, args, 0)?;
                json!(self.remove_tray_icon(&name))
            }
            BuiltinOperation::SetTrayAlert => {
                let name: String = required_arg(op, args, 0)?;
                let alert: bool = required_arg(op, args, 1)?;
                json!(self.set_tray_alert(&name, alert))
            }
            BuiltinOperation::TryQuitOnAllWindowsClosed => {
                json!(self.try_quit_on_all_windows_closed())
            }
            BuiltinOperation::CurrentFocusWindow => json!(self.current_focus_window()),
            BuiltinOperation::WindowNames => json!(self.registry().names()),
            BuiltinOperation::AppConfig => serde_json::to_value(self.config())
                .map_err(|e| OperationError::Failed(e.to_string()))?,
            BuiltinOperation::RootPath => json!(self.config().root_path),
            BuiltinOperation::Quit => {
                self.quit(ExitReason::Requested);
                Value::Null
            }
        };
        Ok(Invocation::Immediate(value))
    }
}
