mod users {
  tonic::include_proto!("users");
}

pub use users::*;

/// Encoded descriptors of `users.proto`, served over gRPC reflection.
pub const FILE_DESCRIPTOR_SET: &[u8] =
  tonic::include_file_descriptor_set!("users_descriptor");

pub trait FromProto {
  type ProtoType: prost::Message;

  fn from_proto(proto: Self::ProtoType) -> crate::Result<Self>
  where
    Self: Sized;
}

pub trait ToProto {
  type ProtoType: prost::Message;

  fn to_proto(self) -> crate::Result<Self::ProtoType>
  where
    Self: Sized;
}
