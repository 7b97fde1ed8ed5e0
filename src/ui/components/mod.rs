mod form;
mod list;

pub use form::{FormField, FormValues, FormView};
pub use list::{page_window, PagedList};
