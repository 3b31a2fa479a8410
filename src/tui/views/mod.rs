pub mod book_form;
pub mod books;
