pub mod blur_editor;
pub mod blurred_image;
pub mod gallery_form;
pub mod gallery_list;
pub mod header;
pub mod status_banner;
