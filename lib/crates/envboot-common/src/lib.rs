pub mod state;

pub use state::{
    CredentialsRef, Director, EnvState, Infrastructure, Jumpbox, KeyPair, LB_TYPE_NONE,
    LoadBalancer, MIN_SUPPORTED_SCHEMA, STATE_FILE_NAME, STATE_SCHEMA,
};
