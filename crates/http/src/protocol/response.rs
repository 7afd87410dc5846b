use http::Response;

/// A response with its body split off, as handed to the header encoder.
pub type ResponseHead = Response<()>;
