pub mod uploaded_image;
