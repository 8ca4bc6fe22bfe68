pub mod uploaded_image_repo;

pub use uploaded_image_repo::UploadedImageRepo;
