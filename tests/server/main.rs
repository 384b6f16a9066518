mod color;
mod faults;
mod site;
mod thumbnails_api;
mod validation;
