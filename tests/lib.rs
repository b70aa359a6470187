use indoc::{formatdoc, indoc};
use pretty_assertions::assert_eq;

use vkhpp_generator::Registry;

const TYPES: &str = indoc! {r#"
        <type name="vk_platform" category="include">#include "vk_platform.h"</type>
        <type requires="vk_platform" name="void"/>
        <type requires="vk_platform" name="char"/>
        <type requires="vk_platform" name="uint32_t"/>
        <type requires="vk_platform" name="uint64_t"/>
        <type category="define">// Version of this file
#define <name>VK_HEADER_VERSION</name> 42</type>
        <type category="define">#define <name>VK_DEFINE_HANDLE</name>(object) typedef struct object##_T* object;</type>
        <type category="define" name="VK_DEFINE_NON_DISPATCHABLE_HANDLE">
#if defined(__LP64__) || defined(_WIN64) || (defined(__x86_64__) &amp;&amp; !defined(__ILP32__) )
        #define VK_DEFINE_NON_DISPATCHABLE_HANDLE(object) typedef struct object##_T *object;
#else
        #define VK_DEFINE_NON_DISPATCHABLE_HANDLE(object) typedef uint64_t object;
#endif</type>
        <type category="basetype">typedef <type>uint32_t</type> <name>VkFlags</name>;</type>
        <type category="basetype">typedef <type>uint32_t</type> <name>VkBool32</name>;</type>
        <type name="VkResult" category="enum"/>
        <type name="VkStructureType" category="enum"/>
        <type category="handle"><type>VK_DEFINE_HANDLE</type>(<name>VkInstance</name>)</type>
        <type category="handle" parent="VkInstance"><type>VK_DEFINE_HANDLE</type>(<name>VkPhysicalDevice</name>)</type>
        <type category="handle" parent="VkPhysicalDevice"><type>VK_DEFINE_HANDLE</type>(<name>VkDevice</name>)</type>
        <type category="struct" name="VkAllocationCallbacks">
            <member optional="true"><type>void</type>* <name>pUserData</name></member>
        </type>
        <type category="struct" name="VkInstanceCreateInfo">
            <member values="VK_STRUCTURE_TYPE_INSTANCE_CREATE_INFO"><type>VkStructureType</type> <name>sType</name></member>
            <member optional="true">const <type>void</type>* <name>pNext</name></member>
            <member optional="true"><type>uint32_t</type> <name>enabledLayerCount</name></member>
        </type>
        <type category="struct" name="VkInstanceCreateInfoKHR" alias="VkInstanceCreateInfo"/>
"#};

const ENUMS: &str = indoc! {r#"
    <enums name="API Constants" type="constants">
        <enum type="uint32_t" value="256" name="VK_MAX_EXTENSION_NAME_SIZE"/>
    </enums>
    <enums name="VkResult" type="enum">
        <enum value="0" name="VK_SUCCESS"/>
        <enum value="5" name="VK_INCOMPLETE"/>
        <enum value="-1" name="VK_ERROR_OUT_OF_HOST_MEMORY"/>
        <enum name="VK_SUCCESS_KHR" alias="VK_SUCCESS"/>
    </enums>
    <enums name="VkStructureType" type="enum">
        <enum value="1" name="VK_STRUCTURE_TYPE_INSTANCE_CREATE_INFO"/>
    </enums>
"#};

const COMMANDS: &str = indoc! {r#"
        <command successcodes="VK_SUCCESS" errorcodes="VK_ERROR_OUT_OF_HOST_MEMORY">
            <proto><type>VkResult</type> <name>vkCreateInstance</name></proto>
            <param>const <type>VkInstanceCreateInfo</type>* <name>pCreateInfo</name></param>
            <param optional="true">const <type>VkAllocationCallbacks</type>* <name>pAllocator</name></param>
            <param><type>VkInstance</type>* <name>pInstance</name></param>
        </command>
        <command>
            <proto><type>void</type> <name>vkDestroyInstance</name></proto>
            <param optional="true"><type>VkInstance</type> <name>instance</name></param>
            <param optional="true">const <type>VkAllocationCallbacks</type>* <name>pAllocator</name></param>
        </command>
        <command successcodes="VK_SUCCESS,VK_INCOMPLETE" errorcodes="VK_ERROR_OUT_OF_HOST_MEMORY">
            <proto><type>VkResult</type> <name>vkEnumeratePhysicalDevices</name></proto>
            <param><type>VkInstance</type> <name>instance</name></param>
            <param optional="false,true"><type>uint32_t</type>* <name>pPhysicalDeviceCount</name></param>
            <param optional="true" len="pPhysicalDeviceCount"><type>VkPhysicalDevice</type>* <name>pPhysicalDevices</name></param>
        </command>
        <command name="vkEnumeratePhysicalDevicesKHR" alias="vkEnumeratePhysicalDevices"/>
        <command successcodes="VK_SUCCESS,VK_INCOMPLETE" errorcodes="VK_ERROR_OUT_OF_HOST_MEMORY">
            <proto><type>VkResult</type> <name>vkGetDataEXT</name></proto>
            <param><type>VkDevice</type> <name>device</name></param>
            <param len="null-terminated">const <type>char</type>* <name>pName</name></param>
            <param optional="false,true"><type>uint32_t</type>* <name>pDataSize</name></param>
            <param optional="true" len="pDataSize"><type>void</type>* <name>pData</name></param>
        </command>
"#};

const FEATURE: &str = indoc! {r#"
    <feature api="vulkan" name="VK_VERSION_1_0" number="1.0">
        <require>
            <type name="vk_platform"/>
            <command name="vkCreateInstance"/>
            <command name="vkDestroyInstance"/>
            <command name="vkEnumeratePhysicalDevices"/>
        </require>
    </feature>
"#};

const EXTENSIONS: &str = indoc! {r#"
        <extension name="VK_EXT_data" number="1" type="device" supported="vulkan">
            <require>
                <command name="vkGetDataEXT"/>
            </require>
        </extension>
"#};

/// A registry with the boilerplate every document needs, plus the given extra content.
fn document(types: &str, enums: &str, commands: &str, extensions: &str) -> String {
    formatdoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <registry>
            <comment>
        Copyright 2015-2024 The Khronos Group Inc.

        SPDX-License-Identifier: Apache-2.0
            </comment>
            <platforms>
                <platform name="win32" protect="VK_USE_PLATFORM_WIN32_KHR"/>
            </platforms>
            <tags>
                <tag name="KHR" author="Khronos" contact="nobody"/>
                <tag name="EXT" author="Multivendor" contact="nobody"/>
            </tags>
            <types>
        {TYPES}{types}
            </types>
        {ENUMS}{enums}
            <commands>
        {COMMANDS}{commands}
            </commands>
        {FEATURE}
            <extensions>
        {EXTENSIONS}{extensions}
            </extensions>
        </registry>
    "#,
        TYPES = TYPES,
        ENUMS = ENUMS,
        COMMANDS = COMMANDS,
        FEATURE = FEATURE,
        EXTENSIONS = EXTENSIONS,
        types = types,
        enums = enums,
        commands = commands,
        extensions = extensions,
    }
}

fn base() -> String {
    document("", "", "", "")
}

/// Line of the first occurrence of `needle`, counted the way the registry reader does.
fn line_of(source: &str, needle: &str) -> u64 {
    let index = source.lines().position(|l| l.contains(needle)).expect("needle not in source");
    index as u64 + 1
}

/// Indents every line of `body` by `by` spaces, the way the header nests function bodies.
fn indented(body: &str, by: usize) -> String {
    body.lines().map(|l| format!("{:by$}{}\n", "", l, by = by)).collect()
}

fn read(source: &str) -> Registry {
    let registry = Registry::new(source.as_bytes()).unwrap();
    registry.check_correctness().unwrap();
    registry
}

#[test]
fn header_data() {
    let registry = read(&base());
    assert_eq!(registry.header_version, "42");
    assert!(registry.typesafe_check.starts_with("#if defined(__LP64__) || defined(_WIN64)"));
    assert!(registry.license_header.starts_with("// Copyright 2015-2024 The Khronos Group Inc."));

    let header = vkhpp_generator::generate(base().as_bytes()).unwrap();
    assert!(header.contains("static_assert( VK_HEADER_VERSION == 42 , \"Wrong VK_HEADER_VERSION!\" );"));
    assert!(header.contains("namespace VULKAN_HPP_NAMESPACE\n{\n"));
    assert!(header.ends_with("} // namespace VULKAN_HPP_NAMESPACE\n#endif\n"));
}

#[test]
fn generation_is_deterministic() {
    let source = base();
    let first = vkhpp_generator::generate(source.as_bytes()).unwrap();
    let second = vkhpp_generator::generate(source.as_bytes()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn output_sections_are_ordered() {
    let header = vkhpp_generator::generate(base().as_bytes()).unwrap();
    let sections = [
        "class ArrayProxy",
        "class DispatchLoaderStatic",
        "class DispatchLoaderDynamic",
        "enum class Result",
        "struct InstanceCreateInfo;",
        "class OutOfHostMemoryError : public SystemError",
        "class Instance\n",
        "struct InstanceCreateInfo\n",
        "VULKAN_HPP_INLINE void DispatchLoaderDynamic::init( Instance const& instance )",
    ];
    let positions: Vec<usize> = sections.iter()
        .map(|s| header.find(s).unwrap_or_else(|| panic!("missing <{}>", s)))
        .collect();
    let mut sorted = positions.clone();
    sorted.sort();
    assert_eq!(positions, sorted);
}

#[test]
fn two_step_query_loops_while_incomplete() {
    let header = vkhpp_generator::generate(base().as_bytes()).unwrap();
    let body = indoc! {"
        do
        {
          result = static_cast<Result>( d.vkEnumeratePhysicalDevices( m_instance, &physicalDeviceCount, nullptr ) );
          if ( ( result == Result::eSuccess ) && physicalDeviceCount )
          {
            physicalDevices.resize( physicalDeviceCount );
            result = static_cast<Result>( d.vkEnumeratePhysicalDevices( m_instance, &physicalDeviceCount, reinterpret_cast<VkPhysicalDevice*>( physicalDevices.data() ) ) );
          }
        } while ( result == Result::eIncomplete );
    "};
    assert!(header.contains(&indented(body, 4)), "two-step body not found");
}

#[test]
fn untyped_two_step_query_returns_bytes() {
    let registry = read(&base());
    let command = &registry.commands["vkGetDataEXT"];
    assert!(command.shape.two_step);
    assert_eq!(command.shape.template_param, Some(3));
    assert_eq!(command.shape.vector_params.get(&3), Some(&Some(2)));

    let header = registry.gen_hpp().unwrap();
    assert!(header.contains("std::vector<uint8_t,Allocator>"));
    assert!(header.contains("d.vkGetDataEXT( m_device, pName, pDataSize, pData )"));
}

#[test]
fn dynamic_loader_classifies_entry_points() {
    let header = vkhpp_generator::generate(base().as_bytes()).unwrap();
    assert!(header.contains("    PFN_vkEnumeratePhysicalDevicesKHR vkEnumeratePhysicalDevicesKHR = 0;\n"));
    assert!(header.contains("    PFN_vkGetInstanceProcAddr vkGetInstanceProcAddr = 0;\n"));
    assert!(header.contains(
        "    vkCreateInstance = PFN_vkCreateInstance( vkGetInstanceProcAddr( VK_NULL_HANDLE, \"vkCreateInstance\" ) );\n"
    ));
    assert!(header.contains(
        "    vkEnumeratePhysicalDevices = PFN_vkEnumeratePhysicalDevices( vkGetInstanceProcAddr( instance, \"vkEnumeratePhysicalDevices\" ) );\n"
    ));
    assert!(header.contains(
        "    vkGetDataEXT = PFN_vkGetDataEXT( device ? vkGetDeviceProcAddr( device, \"vkGetDataEXT\" ) : vkGetInstanceProcAddr( instance, \"vkGetDataEXT\" ) );\n"
    ));

    let reinit = indoc! {"
        #if defined( VK_NO_PROTOTYPES )
        #  define VULKAN_HPP_INSTANCE_PROC_ADDR vkGetInstanceProcAddr
        #else
        #  define VULKAN_HPP_INSTANCE_PROC_ADDR ( vkGetInstanceProcAddr ? vkGetInstanceProcAddr : ::vkGetInstanceProcAddr )
        #endif
    "};
    let guard = header.find(reinit).expect("exported loader is not guarded");
    let reinit_instance = header.find("DispatchLoaderDynamic::init( Instance const& instance )").unwrap();
    assert!(guard < reinit_instance);

    let reinit = indoc! {"
        #if defined( VK_NO_PROTOTYPES )
        #  define VULKAN_HPP_INSTANCE_PROC_ADDR vkGetInstanceProcAddr
        #else
        #  define VULKAN_HPP_INSTANCE_PROC_ADDR ( vkGetInstanceProcAddr ? vkGetInstanceProcAddr : ::vkGetInstanceProcAddr )
        #endif
    "};
    let guard = header.find(reinit).expect("exported loader is not guarded");
    let reinit_instance = header.find("DispatchLoaderDynamic::init( Instance const& instance )").unwrap();
    assert!(guard < reinit_instance);
}

const THING: &str = r#"
        <type category="handle" parent="VkDevice"><type>VK_DEFINE_NON_DISPATCHABLE_HANDLE</type>(<name>VkThing</name>)</type>"#;

#[test]
fn two_parameter_deleter_registers_its_target() {
    let destroy = r#"
        <command>
            <proto><type>void</type> <name>vkDestroyThing</name></proto>
            <param><type>VkDevice</type> <name>device</name></param>
            <param><type>VkThing</type> <name>thing</name></param>
        </command>"#;
    let registry = read(&document(THING, "", destroy, ""));
    let thing = &registry.handles["VkThing"];
    assert_eq!(thing.delete_command.as_deref(), Some("vkDestroyThing"));
    assert_eq!(thing.delete_owner.as_deref(), Some("VkDevice"));
    assert_eq!(thing.delete_pool, None);
    assert!(registry.handles["VkDevice"].children.contains("VkThing"));

    let header = registry.gen_hpp().unwrap();
    assert!(header.contains("using deleter = ObjectDestroy<Device,Dispatch>;"));
    assert!(header.contains("using UniqueThing = UniqueHandle<Thing,DispatchLoaderStatic>;"));
}

#[test]
fn second_deleter_is_fatal() {
    let deleters = r#"
        <command>
            <proto><type>void</type> <name>vkDestroyThing</name></proto>
            <param><type>VkDevice</type> <name>device</name></param>
            <param><type>VkThing</type> <name>thing</name></param>
        </command>
        <command>
            <proto><type>void</type> <name>vkFreeThing</name></proto>
            <param><type>VkDevice</type> <name>device</name></param>
            <param><type>VkThing</type> <name>thing</name></param>
        </command>"#;
    let source = document(THING, "", deleters, "");
    let err = Registry::new(source.as_bytes()).unwrap_err();
    assert!(err.to_string().contains("is already released by <vkDestroyThing>"), "{}", err);
}

#[test]
fn colliding_enum_names_are_fatal() {
    let types = r#"
        <type name="VkColor" category="enum"/>"#;
    let collision = r#"
    <enums name="VkColor" type="enum">
        <enum value="0" name="VK_COLOR_A1B"/>
        <enum value="1" name="VK_COLOR_A1_B"/>
    </enums>"#;
    let source = document(types, collision, "", "");
    let err = Registry::new(source.as_bytes()).unwrap_err();
    assert!(err.to_string().contains("maps to same C++-name"), "{}", err);
    assert_eq!(err.line(), Some(line_of(&source, "VK_COLOR_A1_B")));

    let distinct = r#"
    <enums name="VkColor" type="enum">
        <enum value="0" name="VK_COLOR_RED"/>
        <enum value="1" name="VK_COLOR_GREEN"/>
    </enums>"#;
    let header = vkhpp_generator::generate(document(types, distinct, "", "").as_bytes()).unwrap();
    assert!(header.contains("    eRed = VK_COLOR_RED,\n    eGreen = VK_COLOR_GREEN\n"));
}

#[test]
fn disabled_extension_is_removed() {
    let types = r#"
        <type category="struct" name="VkDisabledInfoEXT">
            <member><type>uint32_t</type> <name>value</name></member>
        </type>"#;
    let commands = r#"
        <command>
            <proto><type>void</type> <name>vkDisabledEXT</name></proto>
            <param><type>VkDevice</type> <name>device</name></param>
            <param>const <type>VkDisabledInfoEXT</type>* <name>pInfo</name></param>
        </command>"#;
    let extensions = r#"
        <extension name="VK_EXT_disabled" number="2" supported="disabled">
            <require>
                <enum offset="0" extends="VkResult" dir="-" name="VK_ERROR_DISABLED_EXT"/>
                <type name="VkDisabledInfoEXT"/>
                <command name="vkDisabledEXT"/>
            </require>
        </extension>"#;
    let registry = read(&document(types, "", commands, extensions));

    assert!(!registry.commands.contains_key("vkDisabledEXT"));
    assert!(!registry.command_to_handle.contains_key("vkDisabledEXT"));
    assert!(!registry.handles["VkDevice"].commands.contains("vkDisabledEXT"));
    assert!(!registry.enums["VkResult"].values.iter().any(|v| v.vk_value == "VK_ERROR_DISABLED_EXT"));
    assert!(!registry.structures.contains_key("VkDisabledInfoEXT"));
    assert!(!registry.types.contains_key("VkDisabledInfoEXT"));
    assert!(!registry.extensions.contains_key("VK_EXT_disabled"));
}

#[test]
fn prefix_struct_becomes_sub_struct() {
    let types = r#"
        <type category="struct" name="VkExtentA">
            <member><type>uint32_t</type> <name>width</name></member>
            <member><type>uint32_t</type> <name>height</name></member>
            <member><type>uint32_t</type> <name>depth</name></member>
        </type>
        <type category="struct" name="VkExtentB">
            <member><type>uint32_t</type> <name>width</name></member>
            <member><type>uint32_t</type> <name>height</name></member>
            <member><type>uint32_t</type> <name>depth</name></member>
            <member><type>uint32_t</type> <name>layers</name></member>
        </type>"#;
    let registry = read(&document(types, "", "", ""));
    assert_eq!(registry.structures["VkExtentB"].sub_struct.as_deref(), Some("VkExtentA"));
    assert_eq!(registry.structures["VkExtentA"].sub_struct, None);

    let header = registry.gen_hpp().unwrap();
    assert!(header.contains("    explicit ExtentB( ExtentA const& rhs"));
    assert!(header.contains("      : width( rhs.width )\n      , height( rhs.height )\n      , depth( rhs.depth )\n"));
}

#[test]
fn aliases_resolve_to_their_targets() {
    let registry = read(&base());

    assert!(!registry.commands.contains_key("vkEnumeratePhysicalDevicesKHR"));
    assert!(registry.commands["vkEnumeratePhysicalDevices"].aliases.contains("vkEnumeratePhysicalDevicesKHR"));
    assert_eq!(
        registry.command_to_handle["vkEnumeratePhysicalDevicesKHR"],
        registry.command_to_handle["vkEnumeratePhysicalDevices"]
    );

    assert_eq!(registry.resolve_type("VkInstanceCreateInfoKHR"), "VkInstanceCreateInfo");
    assert!(!registry.structures.contains_key("VkInstanceCreateInfoKHR"));
    let (name, _) = registry.structure("VkInstanceCreateInfoKHR").unwrap();
    assert_eq!(name, "VkInstanceCreateInfo");

    let result = &registry.enums["VkResult"];
    assert_eq!(result.values.len(), 3);
    assert_eq!(registry.enum_value_name("VkResult", "VK_SUCCESS_KHR"), Some("eSuccessKHR"));

    let header = registry.gen_hpp().unwrap();
    assert!(header.contains("  using InstanceCreateInfoKHR = InstanceCreateInfo;\n"));
}

#[test]
fn dangling_member_type_is_reported_by_the_checker() {
    let types = r#"
        <type category="struct" name="VkBroken">
            <member><type>VkMissing</type> <name>missing</name></member>
        </type>"#;
    let source = document(types, "", "", "");
    let registry = Registry::new(source.as_bytes()).unwrap();
    let err = registry.check_correctness().unwrap_err();
    assert_eq!(err.line(), Some(line_of(&source, "VkMissing")));
    assert!(err.to_string().contains("has unknown type <VkMissing>"), "{}", err);
}

#[test]
fn missing_attribute_reports_its_line() {
    let types = r#"
        <type category="struct">
            <member><type>uint32_t</type> <name>value</name></member>
        </type>"#;
    let source = document(types, "", "", "");
    let err = Registry::new(source.as_bytes()).unwrap_err();
    let line = line_of(&source, "<type category=\"struct\">");
    assert_eq!(err.to_string(), format!("Spec error on line {}: missing attribute <name> in element <type>", line));
}

const OBJECTS: &str = r#"
        <type category="basetype">typedef <type>uint64_t</type> <name>VkDeviceSize</name>;</type>
        <type category="handle" parent="VkDevice"><type>VK_DEFINE_NON_DISPATCHABLE_HANDLE</type>(<name>VkBuffer</name>)</type>
        <type category="handle" parent="VkDevice"><type>VK_DEFINE_NON_DISPATCHABLE_HANDLE</type>(<name>VkCommandPool</name>)</type>
        <type category="handle" parent="VkCommandPool"><type>VK_DEFINE_HANDLE</type>(<name>VkCommandBuffer</name>)</type>
        <type category="struct" name="VkBufferCreateInfo">
            <member><type>VkDeviceSize</type> <name>size</name></member>
        </type>
        <type category="struct" name="VkCommandBufferAllocateInfo">
            <member><type>VkCommandPool</type> <name>commandPool</name></member>
            <member><type>uint32_t</type> <name>commandBufferCount</name></member>
        </type>"#;

const DESTROY_BUFFER: &str = r#"
        <command>
            <proto><type>void</type> <name>vkDestroyBuffer</name></proto>
            <param><type>VkDevice</type> <name>device</name></param>
            <param optional="true"><type>VkBuffer</type> <name>buffer</name></param>
            <param optional="true">const <type>VkAllocationCallbacks</type>* <name>pAllocator</name></param>
        </command>"#;

#[test]
fn sequences_sharing_a_count_are_checked_for_equal_size() {
    let bind = r#"
        <command>
            <proto><type>void</type> <name>vkCmdBindVertexBuffers</name></proto>
            <param><type>VkCommandBuffer</type> <name>commandBuffer</name></param>
            <param><type>uint32_t</type> <name>firstBinding</name></param>
            <param><type>uint32_t</type> <name>bindingCount</name></param>
            <param len="bindingCount">const <type>VkBuffer</type>* <name>pBuffers</name></param>
            <param len="bindingCount">const <type>VkDeviceSize</type>* <name>pOffsets</name></param>
        </command>"#;
    let header = vkhpp_generator::generate(document(OBJECTS, "", bind, "").as_bytes()).unwrap();

    let signature = "  VULKAN_HPP_INLINE void CommandBuffer::bindVertexBuffers( uint32_t firstBinding, \
                     ArrayProxy<const Buffer> buffers, ArrayProxy<const DeviceSize> offsets, Dispatch const & d ) const\n  {\n";
    let body = indoc! {r#"
        #ifdef VULKAN_HPP_NO_EXCEPTIONS
            VULKAN_HPP_ASSERT( buffers.size() == offsets.size() );
        #else
            if ( buffers.size() != offsets.size() )
            {
              throw LogicError( VULKAN_HPP_NAMESPACE_STRING"::CommandBuffer::bindVertexBuffers: buffers.size() != offsets.size()" );
            }
        #endif  /*VULKAN_HPP_NO_EXCEPTIONS*/
            d.vkCmdBindVertexBuffers( m_commandBuffer, firstBinding, buffers.size(), reinterpret_cast<const VkBuffer*>( buffers.data() ), reinterpret_cast<const VkDeviceSize*>( offsets.data() ) );
          }
    "#};
    assert!(header.contains(&format!("{}{}", signature, body)), "size check of bindVertexBuffers not found");
}

#[test]
fn pool_deleter_frees_unique_objects_to_their_pool() {
    let commands = format!("{}{}", DESTROY_BUFFER, r#"
        <command successcodes="VK_SUCCESS" errorcodes="VK_ERROR_OUT_OF_HOST_MEMORY">
            <proto><type>VkResult</type> <name>vkAllocateCommandBuffers</name></proto>
            <param><type>VkDevice</type> <name>device</name></param>
            <param>const <type>VkCommandBufferAllocateInfo</type>* <name>pAllocateInfo</name></param>
            <param len="pAllocateInfo-&gt;commandBufferCount"><type>VkCommandBuffer</type>* <name>pCommandBuffers</name></param>
        </command>
        <command>
            <proto><type>void</type> <name>vkFreeCommandBuffers</name></proto>
            <param><type>VkDevice</type> <name>device</name></param>
            <param><type>VkCommandPool</type> <name>commandPool</name></param>
            <param><type>uint32_t</type> <name>commandBufferCount</name></param>
            <param len="commandBufferCount">const <type>VkCommandBuffer</type>* <name>pCommandBuffers</name></param>
        </command>
        <command successcodes="VK_SUCCESS" errorcodes="VK_ERROR_OUT_OF_HOST_MEMORY">
            <proto><type>VkResult</type> <name>vkCreateBuffer</name></proto>
            <param><type>VkDevice</type> <name>device</name></param>
            <param>const <type>VkBufferCreateInfo</type>* <name>pCreateInfo</name></param>
            <param optional="true">const <type>VkAllocationCallbacks</type>* <name>pAllocator</name></param>
            <param><type>VkBuffer</type>* <name>pBuffer</name></param>
        </command>"#);
    let registry = read(&document(OBJECTS, "", &commands, ""));

    let command_buffer = &registry.handles["VkCommandBuffer"];
    assert_eq!(command_buffer.delete_command.as_deref(), Some("vkFreeCommandBuffers"));
    assert_eq!(command_buffer.delete_owner.as_deref(), Some("VkDevice"));
    assert_eq!(command_buffer.delete_pool.as_deref(), Some("VkCommandPool"));
    assert!(registry.handles["VkDevice"].children.contains("VkCommandBuffer"));
    assert_eq!(registry.handles["VkBuffer"].delete_pool, None);

    let header = registry.gen_hpp().unwrap();
    assert!(header.contains("using deleter = PoolFree<Device,CommandPool,Dispatch>;"));
    assert!(header.contains("using deleter = ObjectDestroy<Device,Dispatch>;"));

    let allocate = indoc! {r#"
        std::vector<UniqueHandle<CommandBuffer,Dispatch>,Allocator> uniqueCommandBuffers;
        std::vector<CommandBuffer> commandBuffers( allocateInfo.commandBufferCount );
        Result result = static_cast<Result>( d.vkAllocateCommandBuffers( m_device, reinterpret_cast<const VkCommandBufferAllocateInfo*>( &allocateInfo ), reinterpret_cast<VkCommandBuffer*>( commandBuffers.data() ) ) );
        if ( result == Result::eSuccess )
        {
          uniqueCommandBuffers.reserve( commandBuffers.size() );
          PoolFree<Device,CommandPool,Dispatch> deleter( *this, allocateInfo.commandPool, d );
          for ( size_t i = 0; i < commandBuffers.size(); i++ )
          {
            uniqueCommandBuffers.push_back( UniqueHandle<CommandBuffer,Dispatch>( commandBuffers[i], deleter ) );
          }
        }
        return createResultValue( result, uniqueCommandBuffers, VULKAN_HPP_NAMESPACE_STRING"::Device::allocateCommandBuffersUnique" );
    "#};
    assert!(header.contains(
        "  VULKAN_HPP_INLINE typename ResultValueType<std::vector<UniqueHandle<CommandBuffer,Dispatch>,Allocator>>::type \
         Device::allocateCommandBuffersUnique( const CommandBufferAllocateInfo & allocateInfo, Dispatch const & d ) const\n"
    ));
    assert!(header.contains(&indented(allocate, 4)), "allocateCommandBuffersUnique body not found");

    let create = indoc! {r#"
        Buffer buffer;
        Result result = static_cast<Result>( d.vkCreateBuffer( m_device, reinterpret_cast<const VkBufferCreateInfo*>( &createInfo ), reinterpret_cast<const VkAllocationCallbacks*>( static_cast<const AllocationCallbacks*>( allocator ) ), reinterpret_cast<VkBuffer*>( &buffer ) ) );
        ObjectDestroy<Device,Dispatch> deleter( *this, allocator, d );
        return createResultValue<Buffer,Dispatch>( result, buffer, VULKAN_HPP_NAMESPACE_STRING"::Device::createBufferUnique", deleter );
    "#};
    assert!(header.contains(&indented(create, 4)), "createBufferUnique body not found");
}

#[test]
fn sequence_sized_by_its_input_gets_singular_overloads() {
    let commands = format!("{}{}", DESTROY_BUFFER, r#"
        <command successcodes="VK_SUCCESS" errorcodes="VK_ERROR_OUT_OF_HOST_MEMORY">
            <proto><type>VkResult</type> <name>vkCreateBuffers</name></proto>
            <param><type>VkDevice</type> <name>device</name></param>
            <param><type>uint32_t</type> <name>createInfoCount</name></param>
            <param len="createInfoCount">const <type>VkBufferCreateInfo</type>* <name>pCreateInfos</name></param>
            <param optional="true">const <type>VkAllocationCallbacks</type>* <name>pAllocator</name></param>
            <param len="createInfoCount"><type>VkBuffer</type>* <name>pBuffers</name></param>
        </command>"#);
    let header = vkhpp_generator::generate(document(OBJECTS, "", &commands, "").as_bytes()).unwrap();
    let allocator = "reinterpret_cast<const VkAllocationCallbacks*>( static_cast<const AllocationCallbacks*>( allocator ) )";

    let vector = formatdoc! {r#"
        std::vector<Buffer,Allocator> buffers( createInfos.size() );
        Result result = static_cast<Result>( d.vkCreateBuffers( m_device, createInfos.size(), reinterpret_cast<const VkBufferCreateInfo*>( createInfos.data() ), {allocator}, reinterpret_cast<VkBuffer*>( buffers.data() ) ) );
        return createResultValue( result, buffers, VULKAN_HPP_NAMESPACE_STRING"::Device::createBuffers" );
    "#, allocator = allocator};
    assert!(header.contains(&indented(&vector, 4)), "createBuffers body not found");

    assert!(header.contains(
        "  VULKAN_HPP_INLINE typename ResultValueType<Buffer>::type Device::createBuffer( \
         const BufferCreateInfo & createInfo, Optional<const AllocationCallbacks> allocator, Dispatch const & d ) const\n"
    ));
    let call = format!(
        "d.vkCreateBuffers( m_device, 1, reinterpret_cast<const VkBufferCreateInfo*>( &createInfo ), {}, reinterpret_cast<VkBuffer*>( &buffer ) )",
        allocator
    );
    let singular = formatdoc! {r#"
        Buffer buffer;
        Result result = static_cast<Result>( {call} );
        return createResultValue( result, buffer, VULKAN_HPP_NAMESPACE_STRING"::Device::createBuffer" );
    "#, call = call};
    assert!(header.contains(&indented(&singular, 4)), "createBuffer body not found");

    let unique_singular = formatdoc! {r#"
        Buffer buffer;
        Result result = static_cast<Result>( {call} );
        ObjectDestroy<Device,Dispatch> deleter( *this, allocator, d );
        return createResultValue<Buffer,Dispatch>( result, buffer, VULKAN_HPP_NAMESPACE_STRING"::Device::createBufferUnique", deleter );
    "#, call = call};
    assert!(header.contains(&indented(&unique_singular, 4)), "createBufferUnique body not found");
}

#[test]
fn extended_structure_is_returned_as_a_chain() {
    let types = r#"
        <type category="struct" name="VkProps2" returnedonly="true">
            <member><type>VkStructureType</type> <name>sType</name></member>
            <member optional="true"><type>void</type>* <name>pNext</name></member>
            <member><type>uint32_t</type> <name>value</name></member>
        </type>
        <type category="struct" name="VkExtraProps" returnedonly="true" structextends="VkProps2">
            <member><type>VkStructureType</type> <name>sType</name></member>
            <member optional="true"><type>void</type>* <name>pNext</name></member>
            <member><type>uint32_t</type> <name>extra</name></member>
        </type>"#;
    let get = r#"
        <command>
            <proto><type>void</type> <name>vkGetProps2</name></proto>
            <param><type>VkPhysicalDevice</type> <name>physicalDevice</name></param>
            <param><type>VkProps2</type>* <name>pProps</name></param>
        </command>"#;
    let registry = read(&document(types, "", get, ""));
    assert!(registry.extended_structs.contains("VkProps2"));
    assert!(!registry.extended_structs.contains("VkExtraProps"));

    let header = registry.gen_hpp().unwrap();
    let chain = indoc! {r#"
          template<typename X, typename Y, typename... Z, typename Dispatch>
          VULKAN_HPP_INLINE StructureChain<X, Y, Z...> PhysicalDevice::getProps2( Dispatch const & d ) const
          {
            StructureChain<X, Y, Z...> structureChain;
            Props2 & props = structureChain.template get<Props2>();
            d.vkGetProps2( m_physicalDevice, reinterpret_cast<VkProps2*>( &props ) );
            return structureChain;
          }
    "#};
    assert!(header.contains(&indented(chain, 2)), "structure chain overload not found");
    assert!(header.contains("  template <> struct isStructureChainValid< Props2, ExtraProps>{ enum { value = true }; };\n"));
    assert!(!header.contains("isStructureChainValid< ExtraProps, Props2>"));
}

#[test]
fn disabled_extension_removes_values_added_before_it() {
    let types = r#"
        <type category="enum" name="VkStructureTypeKHR" alias="VkStructureType"/>"#;
    let extensions = r#"
        <extension name="VK_EXT_foo" number="3" type="device" supported="vulkan">
            <require>
                <enum offset="0" extends="VkStructureType" extnumber="3" name="VK_STRUCTURE_TYPE_FOO_EXT"/>
                <enum offset="1" extends="VkStructureType" extnumber="3" name="VK_STRUCTURE_TYPE_BAR_EXT"/>
            </require>
        </extension>
        <extension name="VK_EXT_bar" number="4" supported="disabled">
            <require>
                <enum extends="VkStructureType" name="VK_STRUCTURE_TYPE_FOO_EXT"/>
                <enum extends="VkStructureTypeKHR" name="VK_STRUCTURE_TYPE_BAR_EXT"/>
            </require>
        </extension>"#;
    let registry = read(&document(types, "", "", extensions));
    let values: Vec<&str> = registry.enums["VkStructureType"].values.iter().map(|v| v.vk_value.as_str()).collect();
    assert_eq!(values, vec!["VK_STRUCTURE_TYPE_INSTANCE_CREATE_INFO"]);

    let header = registry.gen_hpp().unwrap();
    assert!(!header.contains("eFooEXT"));
    assert!(!header.contains("eBarEXT"));

    let enabled = document(types, "", "", &extensions.replace("\"disabled\"", "\"vulkan\""));
    let header = vkhpp_generator::generate(enabled.as_bytes()).unwrap();
    assert!(header.contains("eFooEXT = VK_STRUCTURE_TYPE_FOO_EXT"));
}

#[test]
fn unknown_result_codes_are_reported_by_the_checker() {
    let success = r#"
        <command successcodes="VK_SUCCESS,VK_NOT_READY">
            <proto><type>VkResult</type> <name>vkPollEXT</name></proto>
            <param><type>VkDevice</type> <name>device</name></param>
        </command>"#;
    let source = document("", "", success, "");
    let err = Registry::new(source.as_bytes()).unwrap().check_correctness().unwrap_err();
    assert_eq!(err.line(), Some(line_of(&source, "VK_NOT_READY")));
    assert!(err.to_string().contains("command <vkPollEXT> lists unknown result code <VK_NOT_READY>"), "{}", err);

    let error = r#"
        <command successcodes="VK_SUCCESS" errorcodes="VK_ERROR_DEVICE_LOST">
            <proto><type>VkResult</type> <name>vkPollEXT</name></proto>
            <param><type>VkDevice</type> <name>device</name></param>
        </command>"#;
    let source = document("", "", error, "");
    let err = Registry::new(source.as_bytes()).unwrap().check_correctness().unwrap_err();
    assert!(err.to_string().contains("lists unknown result code <VK_ERROR_DEVICE_LOST>"), "{}", err);
}

#[test]
fn result_without_success_codes_is_reported_by_the_checker() {
    let wait = r#"
        <command comment="no codes">
            <proto><type>VkResult</type> <name>vkWaitEXT</name></proto>
            <param><type>VkDevice</type> <name>device</name></param>
        </command>"#;
    let source = document("", "", wait, "");
    let err = Registry::new(source.as_bytes()).unwrap().check_correctness().unwrap_err();
    assert_eq!(err.line(), Some(line_of(&source, "comment=\"no codes\"")));
    assert!(err.to_string().contains("command <vkWaitEXT> returns <VkResult> but lists no success codes"), "{}", err);
}
