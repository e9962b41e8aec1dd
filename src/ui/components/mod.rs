mod command_input;
mod form_modal;
mod input;
mod key_result;
mod picker;
mod search_input;

pub use command_input::{CommandEvent, CommandInput};
pub use form_modal::{FormEvent, FormModal};
pub use key_result::KeyResult;
pub use picker::{Picker, PickerEvent};
pub use search_input::{SearchEvent, SearchInput};
